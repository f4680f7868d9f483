pub mod boolean_coercion;

pub use boolean_coercion::{CoercionPhase, CoercionReport, TypeCoercionEngine};
