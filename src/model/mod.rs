pub mod api;
pub mod common;
pub mod cvr;
pub mod db;
pub mod election;
pub mod mongodb;
