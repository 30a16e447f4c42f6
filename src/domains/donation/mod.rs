pub mod repository;
pub mod types;

pub use repository::{BackendDonationRepository, DonationRepository};
pub use types::{
    DonationFilter, DonationRecord, DonationTypeRef, MemberRef, NewDonation, ANONYMOUS_DONOR,
    UNKNOWN_DONATION_TYPE,
};
