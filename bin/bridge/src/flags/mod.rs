//! CLI flags.

mod globals;
pub(crate) use globals::GlobalArgs;

mod overrides;
pub(crate) use overrides::OverrideArgs;
