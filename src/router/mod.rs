//! Router - hash routes, history direction and the page lifecycle.
//!
//! - [`Route`] - hash parsing and page keys
//! - [`HashHistory`] - forward/back detection with a reactive counter
//! - [`Pager`] - page registry and state machine, driven by [`navigate`]
//!
//! # Example
//!
//! ```ignore
//! use trellis::router::{navigate, Direction};
//!
//! navigate(&mut engine, "#/")?;
//! assert_eq!(navigate(&mut engine, "#/about")?, Direction::Forward);
//! assert_eq!(navigate(&mut engine, "#/")?, Direction::Back);
//! ```

mod history;
mod pager;
mod route;

pub use history::{Direction, HashHistory};
pub use pager::{add_page, navigate, set_main_page, show_page, Pager, PagerEvent, PagerState};
pub use route::{decode_params, page_key, Route};
