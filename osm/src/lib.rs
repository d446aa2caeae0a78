//! Client library for the two upstream OpenStreetMap-facing services:
//! the OAuth2 identity provider + editing API, and the Overpass read
//! mirrors. All network calls go through `reqwest`; nothing here holds
//! state beyond a configured HTTP client.

pub mod auth;
pub mod editing;
pub mod overpass;
pub mod tags;

mod xml;

#[cfg(test)]
mod testutils;
