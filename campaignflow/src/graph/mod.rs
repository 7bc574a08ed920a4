//! Stage graph construction and fan-out expansion.
//!
//! A [`StageGraph`] is built once per run from a [`FlowPlan`](crate::planner::FlowPlan)
//! and never mutated afterwards. Calculate stages are templates; the
//! [`FanOutExpander`] turns them into concrete instances once the width is known.

mod builder;
mod dag;
mod fanout;
mod node;


pub use builder::{StageGraphBuilder, StageNames};
pub use dag::{Edge, StageGraph};
pub use fanout::{FanOutExpander, FanOutInstance, FanOutWidth};
pub use node::{FanOutSpec, InputBinding, StageNode};
