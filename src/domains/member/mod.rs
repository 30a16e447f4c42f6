pub mod repository;
pub mod types;

pub use repository::{BackendMemberRepository, MemberRepository};
pub use types::Member;
