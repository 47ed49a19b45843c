//! The two scraping stages of the pipeline.
//!
//! | Stage | Module | Input | Output |
//! |-------|--------|-------|--------|
//! | Listing extraction | [`listing`] | listing page | records, some with a missing kicker |
//! | Kicker backfill | [`kicker`] | records + detail pages | records with every kicker resolved |
//!
//! Both stages drive the same [`RenderingSession`](crate::session::RenderingSession)
//! strictly sequentially; the session is never shared between concurrent
//! callers.

pub mod kicker;
pub mod listing;
