//! Book preparation stages.
//!
//! ```text
//! book.pdf ──▶ extract ──▶ split ──▶ renumber ──▶ compress
//!              (pdfium)    (halves)  (drop blank)  (JPEG)
//!   book_images/ ─────┘        │            │            │
//!                   individual_pages/ ◀─────┘            ▼
//!                                     individual_pages_compressed/
//! ```
//!
//! 1. [`extract`]  pull the embedded spread scans out of the PDF
//! 2. [`split`]    cut each spread into two pages, with the cover inverted
//!    on the first spread
//! 3. [`renumber`] remove a blank page and shift later pages down, swapping
//!    the whole directory at once
//! 4. [`compress`] resize and re-encode pages for the browser
//!
//! Every stage is synchronous and reads and writes plain directories, so
//! each can be run on its own.

pub mod compress;
pub mod extract;
pub mod renumber;
pub mod split;
