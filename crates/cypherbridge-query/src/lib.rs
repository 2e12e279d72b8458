//! Query compilation for graph pattern-matching databases.
//!
//! Turns a relational-style [`QueryState`] (filters, joins, grouping, having,
//! ordering, pagination) into Cypher text and a parameter map.
//!
//! Pipeline:
//! 1. Build a [`QueryState`]
//! 2. [`StrategyFactory`] picks the standard or aggregation strategy
//! 3. The strategy drives the [`ClauseBuilder`] (and [`ExistsBuilder`] for
//!    relation predicates) and returns a [`CompiledQuery`]
//!
//! ```rust
//! use cypherbridge_query::{compile, Direction, Operator, QueryState};
//!
//! let state = QueryState::new("Post")
//!     .with_alias("p")
//!     .where_basic("published", Operator::Eq, true)
//!     .order_by("views", Direction::Desc)
//!     .limit(5);
//!
//! let compiled = compile(&state).unwrap();
//! assert_eq!(
//!     compiled.cypher(),
//!     "MATCH (p:Post) WHERE p.published = $published RETURN p, p.views ORDER BY p.views DESC LIMIT 5"
//! );
//! ```
//!
//! Every component is pure: no I/O, no shared mutable state, safe to call
//! from any number of threads.

pub mod clause;
pub mod compiled;
pub mod error;
pub mod exists;
pub mod expression;
pub mod state;
pub mod strategy;
pub mod write;

pub use clause::ClauseBuilder;
pub use compiled::{Bindings, CompiledQuery};
pub use error::{CompileError, CompileResult};
pub use exists::{
    EdgeDirection, ExistsBuilder, Relation, RelationConfig, RelationExists, RelationShape,
};
pub use expression::prefix_columns;
pub use state::{
    Column, Condition, Direction, Join, JoinKind, JoinOn, MatchTarget, Operator, Order, QueryState,
};
pub use strategy::{
    compile, compile_with, AggregationStrategy, QueryStrategy, StandardStrategy, StrategyFactory,
    StrategyKind,
};
pub use write::{compile_delete, compile_insert, compile_update, WriteCompiler};

pub use cypherbridge_config::{CompilerConfig, LikeMode};
