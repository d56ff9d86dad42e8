pub mod lead;
pub mod profile;
pub mod qualification;
