//! The persistence and content endpoints as seen from an editor session.

use crate::{
    protocol::{SaveReply, SaveRequest, TransportError},
    store::FileStore,
};

/// Where documents are fetched from and saved to.
///
/// Implementations decide the transport; a conflict is a successful
/// [`SaveReply::Conflict`], never an error.
pub trait Backend {
    fn fetch(&mut self, path: &str) -> Result<String, TransportError>;

    fn save(&mut self, request: &SaveRequest) -> Result<SaveReply, TransportError>;
}

impl Backend for FileStore {
    fn fetch(&mut self, path: &str) -> Result<String, TransportError> {
        Self::fetch(self, path).map_err(TransportError::from)
    }

    fn save(&mut self, request: &SaveRequest) -> Result<SaveReply, TransportError> {
        Self::save(self, request).map_err(TransportError::from)
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn fetch(&mut self, path: &str) -> Result<String, TransportError> {
        (**self).fetch(path)
    }

    fn save(&mut self, request: &SaveRequest) -> Result<SaveReply, TransportError> {
        (**self).save(request)
    }
}
