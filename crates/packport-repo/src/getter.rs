//! Transport capability
//!
//! Resolution logic never constructs sockets: it asks a [`Providers`]
//! registry for a constructor keyed by URL scheme and performs GETs
//! through the [`Getter`] trait, which keeps transports swappable for
//! tests.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{RepoError, Result};
use crate::registry::Entry;

/// A transport that can fetch a URL's body
#[async_trait]
pub trait Getter: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Client-side TLS material for one repository
#[derive(Debug, Clone, Default)]
pub struct GetterOptions {
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub ca_file: Option<PathBuf>,
}

impl GetterOptions {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            cert_file: entry.cert_file.clone(),
            key_file: entry.key_file.clone(),
            ca_file: entry.ca_file.clone(),
        }
    }
}

/// Constructs a transport for one repository's options
pub type GetterConstructor = fn(&GetterOptions) -> Result<Box<dyn Getter>>;

/// One scheme-to-constructor registration
#[derive(Clone)]
pub struct Provider {
    pub schemes: &'static [&'static str],
    pub new: GetterConstructor,
}

/// The capability registry mapping URL schemes to transport constructors
#[derive(Clone, Default)]
pub struct Providers(Vec<Provider>);

impl Providers {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self(providers)
    }

    /// The default registry: HTTP(S) only.
    pub fn all() -> Self {
        Self(vec![Provider {
            schemes: &["http", "https"],
            new: HttpGetter::boxed,
        }])
    }

    /// Look up the constructor for a scheme.
    pub fn by_scheme(&self, scheme: &str) -> Result<GetterConstructor> {
        self.0
            .iter()
            .find(|p| p.schemes.contains(&scheme))
            .map(|p| p.new)
            .ok_or_else(|| RepoError::UnknownScheme {
                scheme: scheme.to_string(),
            })
    }

    pub fn supports(&self, scheme: &str) -> bool {
        self.0.iter().any(|p| p.schemes.contains(&scheme))
    }
}

/// The default HTTP(S) transport
pub struct HttpGetter {
    client: reqwest::Client,
}

impl HttpGetter {
    pub fn new(options: &GetterOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();

        if let (Some(cert), Some(key)) = (&options.cert_file, &options.key_file) {
            let mut pem = std::fs::read(key)?;
            pem.extend(std::fs::read(cert)?);
            let identity = reqwest::Identity::from_pem(&pem)?;
            builder = builder.identity(identity);
        }
        if let Some(ca) = &options.ca_file {
            let cert = reqwest::Certificate::from_pem(&std::fs::read(ca)?)?;
            builder = builder.add_root_certificate(cert);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Constructor suitable for [`Provider::new`].
    pub fn boxed(options: &GetterOptions) -> Result<Box<dyn Getter>> {
        Ok(Box::new(Self::new(options)?))
    }
}

#[async_trait]
impl Getter for HttpGetter {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RepoError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
