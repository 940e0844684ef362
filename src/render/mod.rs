pub mod certificate;

pub use certificate::{CertificateDocument, RenderError, render_certificate};
