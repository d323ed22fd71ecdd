pub mod cmap;
pub mod content;
pub mod document;
pub mod encoding;
pub mod error;
pub mod filters;
pub mod font;
pub mod lexer;
pub mod object;
pub mod page;
pub mod parser;
pub mod stream;
pub mod xref;

pub use document::Document;
pub use error::{PdfError, PdfResult, Warning};
pub use object::{Dict, ObjRef, PdfObject};
pub use page::Page;
pub use xref::XRef;
