/// Answers "may user U join group room R". Private rooms never consult it.
pub trait MembershipBackend: Send + Sync {
    fn is_member(&self, user_id: &str, room_id: &str) -> bool;
}
