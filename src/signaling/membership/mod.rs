mod in_memory_membership;
mod membership_backend;
pub use in_memory_membership::{AllowAllMembership, InMemoryMembership};
pub use membership_backend::MembershipBackend;
