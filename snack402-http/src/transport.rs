//! The seam through which [`PaymentClient`](crate::client::PaymentClient)
//! issues requests.

use std::sync::Arc;

use reqwest::{Request, Response};
use reqwest_middleware as rqm;
use snack402::signer::BoxFuture;

/// Sends one HTTP request and returns its response.
///
/// Implementations must not retry on their own; the payment flow counts on
/// every call reaching the server at most once.
pub trait Transport: Send + Sync {
    /// Issues `request`.
    fn issue(&self, request: Request) -> BoxFuture<'_, rqm::Result<Response>>;
}

impl Transport for reqwest::Client {
    fn issue(&self, request: Request) -> BoxFuture<'_, rqm::Result<Response>> {
        Box::pin(async move { self.execute(request).await.map_err(rqm::Error::from) })
    }
}

impl Transport for rqm::ClientWithMiddleware {
    fn issue(&self, request: Request) -> BoxFuture<'_, rqm::Result<Response>> {
        Box::pin(self.execute(request))
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn issue(&self, request: Request) -> BoxFuture<'_, rqm::Result<Response>> {
        (**self).issue(request)
    }
}
