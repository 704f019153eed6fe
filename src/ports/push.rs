use crate::types::PushMessage;

pub trait PushSender: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(&'a self, device_token: &'a str, message: &'a PushMessage) -> Self::Fut<'a>;
}
