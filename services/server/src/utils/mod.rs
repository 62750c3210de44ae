pub mod jwt;
pub mod responses;
pub mod wallet;
