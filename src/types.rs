use crate::mapping::directives::{FieldBinding, Mappable, TypeDirectives};

/// A page of an edge: `{"data": [...], "paging": {...}}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connection<T> {
    pub data: Vec<T>,
    pub paging: Option<Paging>,
}

impl<T: Mappable> Mappable for Connection<T> {
    fn directives() -> TypeDirectives<Self> {
        TypeDirectives::new()
            .bind(FieldBinding::records("data", |c: &mut Self, v: Vec<T>| c.data = v))
            .bind(FieldBinding::record("paging", |c: &mut Self, v: Paging| c.paging = Some(v)))
    }
}

impl<T> Connection<T> {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Cursor to request the following page with, if there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        let paging = self.paging.as_ref()?;
        paging.next.as_ref()?;
        paging.cursors.as_ref()?.after.as_deref()
    }

    pub fn has_next(&self) -> bool {
        self.paging.as_ref().is_some_and(|p| p.next.is_some())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paging {
    pub cursors: Option<Cursors>,
    /// Full URL of the next page.
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl Mappable for Paging {
    fn directives() -> TypeDirectives<Self> {
        TypeDirectives::new()
            .bind(FieldBinding::record("cursors", |p: &mut Self, v: Cursors| p.cursors = Some(v)))
            .bind(FieldBinding::scalar("next", |p: &mut Self, v: String| p.next = Some(v)))
            .bind(FieldBinding::scalar("previous", |p: &mut Self, v: String| p.previous = Some(v)))
            .hook("drop_empty_links", Paging::drop_empty_links)
    }
}

impl Paging {
    fn drop_empty_links(&mut self) {
        self.next = self.next.take().filter(|s| !s.is_empty());
        self.previous = self.previous.take().filter(|s| !s.is_empty());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursors {
    pub before: Option<String>,
    pub after: Option<String>,
}

impl Mappable for Cursors {
    fn directives() -> TypeDirectives<Self> {
        TypeDirectives::new()
            .bind(FieldBinding::scalar("before", |c: &mut Self, v: String| c.before = Some(v)))
            .bind(FieldBinding::scalar("after", |c: &mut Self, v: String| c.after = Some(v)))
    }
}

/// Answer of the device-login start endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCode {
    pub code: String,
    /// Shown to the user, entered at `verification_uri`.
    pub user_code: String,
    pub verification_uri: String,
    /// Seconds until `code` stops being accepted.
    pub expires_in: i64,
    /// Minimum seconds between polls.
    pub polling_interval: i64,
}

impl Mappable for DeviceCode {
    fn directives() -> TypeDirectives<Self> {
        TypeDirectives::new()
            .bind(FieldBinding::scalar("code", |d: &mut Self, v: String| d.code = v))
            .bind(FieldBinding::scalar("user_code", |d: &mut Self, v: String| d.user_code = v))
            .bind(
                FieldBinding::scalar("verification_uri", |d: &mut Self, v: String| {
                    d.verification_uri = v;
                }),
            )
            .bind(FieldBinding::scalar("expires_in", |d: &mut Self, v: i64| d.expires_in = v))
            .bind(
                FieldBinding::scalar("polling_interval", |d: &mut Self, v: i64| {
                    d.polling_interval = v;
                })
                .from_key("interval"),
            )
    }
}
