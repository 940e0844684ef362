pub mod certificate_service;
pub use certificate_service::{
    BulkIssueReport, CertificateError, CertificateService, ChainStatus, IssueRequest,
    VerifiedCertificate,
};

pub mod certificate_service_impl;
pub use certificate_service_impl::SeaOrmCertificateService;

pub mod account_service;
pub use account_service::{AccountError, AccountService};

pub mod account_service_impl;
pub use account_service_impl::SeaOrmAccountService;

pub mod roster_service;
pub use roster_service::{ImportReport, RosterError, RosterService};

pub mod roster_service_impl;
pub use roster_service_impl::SeaOrmRosterService;
