//! Card Trade API - Backend for a peer-to-peer trading card marketplace
//!
//! This crate provides the REST API for the marketplace, enabling:
//! - Account registration and JWT authentication
//! - A catalog of games and the card bases belonging to them
//! - Card inventories owned by users
//! - Publications listing a card for trade or sale, and offers negotiating them

pub mod auth;
pub mod config;
pub mod db;
pub mod dto;
pub mod entities;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod services;
pub mod state;
