mod login;
pub use login::Login;

mod members;
pub use members::Members;

mod member_detail;
pub use member_detail::MemberDetail;
