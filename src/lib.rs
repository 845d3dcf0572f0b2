pub mod app_config;
pub mod constants;
pub mod db;
pub mod error;
pub mod middleware;
pub mod movies;
pub mod orm;
pub mod petitions;
pub mod reviews;
pub mod user;
pub mod web;
