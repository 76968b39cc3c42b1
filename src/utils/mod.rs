pub mod contact_index;
pub mod patch;
