//! # Providers
//!
//! Providers represent a media file format that can carry a geotag.
//!
//! Each provider has a struct with a [`GeotagProvider`](crate::GeotagProvider)
//! implementation. As of writing, that's only JPEG.

pub mod jpeg;
