//! Relation existence and count predicates.
//!
//! A relation is described once, at construction, by a [`Relation`]: the
//! related label, the [`RelationShape`] that links it to the parent, and a
//! [`RelationConfig`] saying whether the link is stored as foreign-key
//! properties or as native edges. The shape only decides the pattern text;
//! wrapping it into `EXISTS { ... }` is the same for every shape.

use crate::clause::{node_pattern, where_clause, ClauseBuilder, Scope};
use crate::compiled::Bindings;
use crate::error::{CompileError, CompileResult};
use crate::state::{Condition, Operator};

const DEFAULT_RELATED_ALIAS: &str = "r";
const PIVOT_ALIAS: &str = "pivot";
const THROUGH_ALIAS: &str = "through";

/// Direction of a native edge, seen from the parent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeDirection {
    #[default]
    Outgoing,
    Incoming,
    Both,
}

impl EdgeDirection {
    fn arrow(&self, edge: &str) -> String {
        match self {
            EdgeDirection::Outgoing => format!("-[{}]->", edge),
            EdgeDirection::Incoming => format!("<-[{}]-", edge),
            EdgeDirection::Both => format!("-[{}]-", edge),
        }
    }
}

/// How a relation is stored. Empty `edge_types` means foreign-key properties.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationConfig {
    pub edge_types: Vec<String>,
    pub direction: EdgeDirection,
}

impl RelationConfig {
    pub fn native<I, S>(edge_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            edge_types: edge_types.into_iter().map(Into::into).collect(),
            direction: EdgeDirection::Outgoing,
        }
    }

    pub fn with_direction(mut self, direction: EdgeDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn is_native(&self) -> bool {
        !self.edge_types.is_empty()
    }
}

/// Link between the parent node and the related node.
///
/// Key names of `"id"` refer to the native node identity (`id(alias)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationShape {
    /// `related.foreign_key = parent.local_key`
    Direct {
        foreign_key: String,
        local_key: String,
    },
    /// Direct link plus `related.type_key = <type_value>`
    Polymorphic {
        foreign_key: String,
        type_key: String,
        type_value: String,
    },
    /// Link node pointing at both ends
    ManyToMany {
        pivot_label: String,
        parent_key: String,
        related_key: String,
    },
    /// parent -> intermediate -> related
    Through {
        through_label: String,
        first_key: String,
        second_key: String,
    },
}

/// A relation definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub related_label: String,
    pub shape: RelationShape,
    pub config: RelationConfig,
}

impl Relation {
    pub fn direct(related_label: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self::new(
            related_label,
            RelationShape::Direct {
                foreign_key: foreign_key.into(),
                local_key: "id".to_string(),
            },
        )
    }

    pub fn polymorphic(
        related_label: impl Into<String>,
        foreign_key: impl Into<String>,
        type_key: impl Into<String>,
        type_value: impl Into<String>,
    ) -> Self {
        Self::new(
            related_label,
            RelationShape::Polymorphic {
                foreign_key: foreign_key.into(),
                type_key: type_key.into(),
                type_value: type_value.into(),
            },
        )
    }

    pub fn many_to_many(
        related_label: impl Into<String>,
        pivot_label: impl Into<String>,
        parent_key: impl Into<String>,
        related_key: impl Into<String>,
    ) -> Self {
        Self::new(
            related_label,
            RelationShape::ManyToMany {
                pivot_label: pivot_label.into(),
                parent_key: parent_key.into(),
                related_key: related_key.into(),
            },
        )
    }

    pub fn through(
        related_label: impl Into<String>,
        through_label: impl Into<String>,
        first_key: impl Into<String>,
        second_key: impl Into<String>,
    ) -> Self {
        Self::new(
            related_label,
            RelationShape::Through {
                through_label: through_label.into(),
                first_key: first_key.into(),
                second_key: second_key.into(),
            },
        )
    }

    fn new(related_label: impl Into<String>, shape: RelationShape) -> Self {
        Self {
            related_label: related_label.into(),
            shape,
            config: RelationConfig::default(),
        }
    }

    pub fn with_local_key(mut self, key: impl Into<String>) -> Self {
        if let RelationShape::Direct { local_key, .. } = &mut self.shape {
            *local_key = key.into();
        }
        self
    }

    pub fn with_config(mut self, config: RelationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn related_label(&self) -> &str {
        &self.related_label
    }
}

/// `has` / `doesntHave` / count-bounded predicate over a relation.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationExists {
    pub relation: Relation,
    pub operator: Operator,
    pub count: u64,
    pub conditions: Vec<Condition>,
    pub alias: Option<String>,
}

impl RelationExists {
    /// At least one related node.
    pub fn has(relation: Relation) -> Self {
        Self {
            relation,
            operator: Operator::Gte,
            count: 1,
            conditions: Vec::new(),
            alias: None,
        }
    }

    /// No related node.
    pub fn doesnt_have(relation: Relation) -> Self {
        Self::has(relation).with_count(Operator::Lt, 1)
    }

    pub fn with_count(mut self, operator: Operator, count: u64) -> Self {
        self.operator = operator;
        self.count = count;
        self
    }

    /// Extra filter on the related node; bare columns refer to it.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

enum Wrapping {
    Exists,
    NotExists,
    Count,
}

fn wrapping(operator: Operator, count: u64) -> CompileResult<Wrapping> {
    if !operator.is_comparison() {
        return Err(CompileError::InvalidCountOperator {
            operator: operator.to_string(),
        });
    }
    Ok(match (operator, count) {
        (Operator::Gte, 1) | (Operator::Gt, 0) => Wrapping::Exists,
        (Operator::Lt, 1) | (Operator::Eq, 0) | (Operator::Lte, 0) => Wrapping::NotExists,
        _ => Wrapping::Count,
    })
}

fn key_ref(alias: &str, key: &str) -> String {
    if key == "id" {
        format!("id({})", alias)
    } else {
        format!("{}.{}", alias, key)
    }
}

/// Builds `EXISTS { ... }` sub-clauses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistsBuilder {
    clauses: ClauseBuilder,
}

impl ExistsBuilder {
    pub fn new(clauses: ClauseBuilder) -> Self {
        Self { clauses }
    }

    pub fn build(
        &self,
        predicate: &RelationExists,
        parent_alias: &str,
        bindings: &mut Bindings,
    ) -> CompileResult<String> {
        let wrap = wrapping(predicate.operator, predicate.count)?;

        let related = match predicate.alias.as_deref() {
            Some(alias) => alias.to_string(),
            None if parent_alias == DEFAULT_RELATED_ALIAS => format!("{}_1", DEFAULT_RELATED_ALIAS),
            None => DEFAULT_RELATED_ALIAS.to_string(),
        };

        let (pattern, mut conditions) =
            self.pattern(&predicate.relation, parent_alias, &related, bindings);
        conditions.extend(self.clauses.render_conditions(
            &predicate.conditions,
            Scope::Node(&related),
            bindings,
        )?);

        let body = [pattern, where_clause(&conditions)]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(match wrap {
            Wrapping::Exists => format!("EXISTS {{ {} }}", body),
            Wrapping::NotExists => format!("NOT EXISTS {{ {} }}", body),
            Wrapping::Count => format!(
                "EXISTS {{ {} WITH count({}) AS c WHERE c {} {} }}",
                body,
                related,
                predicate.operator.cypher(),
                predicate.count
            ),
        })
    }

    /// Match text for a relation plus the conditions linking it to the parent.
    pub fn pattern(
        &self,
        relation: &Relation,
        parent: &str,
        related: &str,
        bindings: &mut Bindings,
    ) -> (String, Vec<String>) {
        let related_node = node_pattern(&relation.related_label, related);
        let mut conditions = Vec::new();

        if let RelationShape::Polymorphic {
            type_key,
            type_value,
            ..
        } = &relation.shape
        {
            let param = bindings.bind(type_key, type_value.clone().into());
            conditions.push(format!("{}.{} = ${}", related, type_key, param));
        }

        let config = &relation.config;
        if config.is_native() {
            let hop = |edge: &str| config.direction.arrow(&format!(":{}", edge));
            let pattern = match &relation.shape {
                RelationShape::Through { through_label, .. } => {
                    let first = &config.edge_types[0];
                    let second = config.edge_types.get(1).unwrap_or(first);
                    format!(
                        "MATCH ({}){}{}{}{}",
                        parent,
                        hop(first),
                        node_pattern(through_label, THROUGH_ALIAS),
                        hop(second),
                        related_node
                    )
                }
                _ => format!(
                    "MATCH ({}){}{}",
                    parent,
                    hop(&config.edge_types.join("|")),
                    related_node
                ),
            };
            return (pattern, conditions);
        }

        let pattern = match &relation.shape {
            RelationShape::Direct {
                foreign_key,
                local_key,
            } => {
                conditions.insert(
                    0,
                    format!("{}.{} = {}", related, foreign_key, key_ref(parent, local_key)),
                );
                format!("MATCH {}", related_node)
            }
            RelationShape::Polymorphic { foreign_key, .. } => {
                conditions.insert(0, format!("{}.{} = id({})", related, foreign_key, parent));
                format!("MATCH {}", related_node)
            }
            RelationShape::ManyToMany {
                pivot_label,
                parent_key,
                related_key,
            } => {
                conditions.push(format!("{}.{} = id({})", PIVOT_ALIAS, parent_key, parent));
                conditions.push(format!("{}.{} = id({})", PIVOT_ALIAS, related_key, related));
                format!("MATCH {}, {}", node_pattern(pivot_label, PIVOT_ALIAS), related_node)
            }
            RelationShape::Through {
                through_label,
                first_key,
                second_key,
            } => {
                conditions.push(format!("{}.{} = id({})", THROUGH_ALIAS, first_key, parent));
                conditions.push(format!("{}.{} = id({})", related, second_key, THROUGH_ALIAS));
                format!("MATCH {}, {}", node_pattern(through_label, THROUGH_ALIAS), related_node)
            }
        };
        (pattern, conditions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(predicate: &RelationExists) -> (String, Bindings) {
        let mut bindings = Bindings::new();
        let text = ExistsBuilder::default()
            .build(predicate, "n", &mut bindings)
            .unwrap();
        (text, bindings)
    }

    // =========================================================================
    // Wrapping
    // =========================================================================

    #[test]
    fn test_has_is_plain_exists() {
        let (text, _) = build(&RelationExists::has(Relation::direct("Comment", "post_id")));
        assert_eq!(
            text,
            "EXISTS { MATCH (r:Comment) WHERE r.post_id = id(n) }"
        );
    }

    #[test]
    fn test_doesnt_have_is_not_exists() {
        let (text, _) = build(&RelationExists::doesnt_have(Relation::direct("Comment", "post_id")));
        assert_eq!(
            text,
            "NOT EXISTS { MATCH (r:Comment) WHERE r.post_id = id(n) }"
        );
    }

    #[test]
    fn test_count_bound() {
        let predicate = RelationExists::has(Relation::direct("Comment", "post_id"))
            .with_count(Operator::Gte, 3);
        let (text, _) = build(&predicate);
        assert_eq!(
            text,
            "EXISTS { MATCH (r:Comment) WHERE r.post_id = id(n) WITH count(r) AS c WHERE c >= 3 }"
        );
    }

    #[test]
    fn test_non_comparison_count_operator_rejected() {
        let predicate = RelationExists::has(Relation::direct("Comment", "post_id"))
            .with_count(Operator::Like, 2);
        let err = ExistsBuilder::default()
            .build(&predicate, "n", &mut Bindings::new())
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidCountOperator {
                operator: "like".to_string()
            }
        );
    }

    #[test]
    fn test_extra_conditions_use_related_alias() {
        let predicate = RelationExists::has(Relation::direct("Comment", "post_id"))
            .with_condition(Condition::basic("approved", Operator::Eq, true))
            .with_alias("c");
        let (text, bindings) = build(&predicate);
        assert_eq!(
            text,
            "EXISTS { MATCH (c:Comment) WHERE c.post_id = id(n) AND c.approved = $approved }"
        );
        assert_eq!(bindings.get("approved"), Some(&json!(true)));
    }

    #[test]
    fn test_related_alias_avoids_parent() {
        let mut bindings = Bindings::new();
        let text = ExistsBuilder::default()
            .build(
                &RelationExists::has(Relation::direct("Comment", "post_id")),
                "r",
                &mut bindings,
            )
            .unwrap();
        assert_eq!(text, "EXISTS { MATCH (r_1:Comment) WHERE r_1.post_id = id(r) }");
    }

    // =========================================================================
    // Shapes
    // =========================================================================

    #[test]
    fn test_polymorphic_adds_discriminator() {
        let relation = Relation::polymorphic("Image", "imageable_id", "imageable_type", "Post");
        let (text, bindings) = build(&RelationExists::has(relation));
        assert_eq!(
            text,
            "EXISTS { MATCH (r:Image) WHERE r.imageable_id = id(n) AND r.imageable_type = $imageable_type }"
        );
        assert_eq!(bindings.get("imageable_type"), Some(&json!("Post")));
    }

    #[test]
    fn test_many_to_many_links_both_ends() {
        let relation = Relation::many_to_many("Tag", "PostTag", "post_id", "tag_id");
        let (text, _) = build(&RelationExists::has(relation));
        assert_eq!(
            text,
            "EXISTS { MATCH (pivot:PostTag), (r:Tag) WHERE pivot.post_id = id(n) AND pivot.tag_id = id(r) }"
        );
    }

    #[test]
    fn test_through_chains_three_nodes() {
        let relation = Relation::through("Post", "User", "country_id", "user_id");
        let (text, _) = build(&RelationExists::has(relation));
        assert_eq!(
            text,
            "EXISTS { MATCH (through:User), (r:Post) WHERE through.country_id = id(n) AND r.user_id = id(through) }"
        );
    }

    #[test]
    fn test_custom_local_key() {
        let relation = Relation::direct("Profile", "user_uuid").with_local_key("uuid");
        let (text, _) = build(&RelationExists::has(relation));
        assert_eq!(text, "EXISTS { MATCH (r:Profile) WHERE r.user_uuid = n.uuid }");
    }

    // =========================================================================
    // Native edges
    // =========================================================================

    #[test]
    fn test_native_direct_edge() {
        let relation =
            Relation::direct("Comment", "post_id").with_config(RelationConfig::native(["HAS_COMMENT"]));
        let (text, _) = build(&RelationExists::has(relation));
        assert_eq!(text, "EXISTS { MATCH (n)-[:HAS_COMMENT]->(r:Comment) }");
    }

    #[test]
    fn test_native_incoming_multiple_types() {
        let relation = Relation::direct("User", "author_id").with_config(
            RelationConfig::native(["WROTE", "EDITED"]).with_direction(EdgeDirection::Incoming),
        );
        let (text, _) = build(&RelationExists::doesnt_have(relation));
        assert_eq!(text, "NOT EXISTS { MATCH (n)<-[:WROTE|EDITED]-(r:User) }");
    }

    #[test]
    fn test_native_through_two_hops() {
        let relation = Relation::through("Post", "User", "country_id", "user_id")
            .with_config(RelationConfig::native(["HAS_CITIZEN", "WROTE"]));
        let predicate = RelationExists::has(relation).with_count(Operator::Gt, 10);
        let (text, _) = build(&predicate);
        assert_eq!(
            text,
            "EXISTS { MATCH (n)-[:HAS_CITIZEN]->(through:User)-[:WROTE]->(r:Post) WITH count(r) AS c WHERE c > 10 }"
        );
    }
}
