pub mod build;
pub mod distribute;
pub mod inspect;
