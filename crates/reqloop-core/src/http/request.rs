use super::{HttpHeaders, Method, QueryString, RequestBody};
use url::Url;

/// One caller-initiated request. Signers and redirect handling mutate it
/// between attempts; the executor restores query and headers from its
/// snapshot before each retry.
#[derive(Debug)]
pub struct LogicalRequest {
    method: Method,
    target: Url,
    query: QueryString,
    headers: HttpHeaders,
    body: Option<RequestBody>,
}

impl LogicalRequest {
    pub fn new(method: Method, target: Url) -> Self {
        Self {
            method,
            target,
            query: QueryString::new(),
            headers: HttpHeaders::new(),
            body: None,
        }
    }

    /// Build from a URL string.
    pub fn parse(method: Method, target: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(method, Url::parse(target)?))
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.put(key, value);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn set_target(&mut self, target: Url) {
        self.target = target;
    }

    pub fn query(&self) -> &QueryString {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut QueryString {
        &mut self.query
    }

    pub fn set_query(&mut self, query: QueryString) {
        self.query = query;
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HttpHeaders {
        &mut self.headers
    }

    pub fn set_headers(&mut self, headers: HttpHeaders) {
        self.headers = headers;
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Body that will actually be sent: only methods with an entity send one.
    pub fn entity(&self) -> Option<&RequestBody> {
        self.body.as_ref().filter(|_| self.method.has_entity())
    }

    pub fn entity_mut(&mut self) -> Option<&mut RequestBody> {
        if self.method.has_entity() {
            self.body.as_mut()
        } else {
            None
        }
    }

    /// Target with the query parameters applied: the URL put on the wire.
    pub fn url(&self) -> Url {
        self.query.apply_to(&self.target)
    }

    /// Borrows split for building a transport request.
    pub(crate) fn dispatch_parts(&mut self) -> (Method, &HttpHeaders, Option<&mut RequestBody>) {
        let body = if self.method.has_entity() {
            self.body.as_mut()
        } else {
            None
        };
        (self.method, &self.headers, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_applies_query() {
        let req = LogicalRequest::parse(Method::Get, "https://api.example.com/v1/tenants/current")
            .unwrap()
            .with_query("expand", "directories");
        assert_eq!(
            req.url().as_str(),
            "https://api.example.com/v1/tenants/current?expand=directories"
        );
        assert_eq!(req.target().query(), None);
    }

    #[test]
    fn entity_only_for_entity_methods() {
        let get = LogicalRequest::parse(Method::Get, "https://api.example.com/")
            .unwrap()
            .with_body(RequestBody::from_bytes("ignored"));
        assert!(get.body().is_some());
        assert!(get.entity().is_none());

        let post = LogicalRequest::parse(Method::Post, "https://api.example.com/")
            .unwrap()
            .with_body(RequestBody::from_bytes("sent"));
        assert!(post.entity().is_some());
    }
}
