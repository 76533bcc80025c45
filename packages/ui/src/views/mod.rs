mod modal_overlay;
pub use modal_overlay::ModalOverlay;

mod members;
pub use members::{MembersView, StatusBadge};

mod member_detail;
pub use member_detail::MemberDetailView;
