//! Cursor-based paging over list operations
//!
//! ARM and Key Vault return a `nextLink` URL on every page but the last.
//! The OpenAI files API instead reports `has_more` and expects the last item
//! ID back in an `after` query parameter.

use std::marker::PhantomData;

use futures::Stream;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ClientError, ResponseError};
use crate::pipeline::Pipeline;
use crate::request::Request;

/// Where the next page comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Absolute URL of the next page
    NextLink(String),
    /// ID of the last item seen, sent back as `after`
    After(String),
}

/// A single page of a list operation
pub trait Paged: DeserializeOwned {
    type Item;

    /// Cursor for the following page, or `None` on the last page.
    fn next_cursor(&self) -> Option<Cursor>;

    fn into_items(self) -> Vec<Self::Item>;
}

/// The standard `{ "value": [...], "nextLink": "..." }` list envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ArmList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

impl<T: DeserializeOwned> Paged for ArmList<T> {
    type Item = T;

    fn next_cursor(&self) -> Option<Cursor> {
        self.next_link
            .as_deref()
            .filter(|link| !link.is_empty())
            .map(|link| Cursor::NextLink(link.to_string()))
    }

    fn into_items(self) -> Vec<T> {
        self.value
    }
}

enum PageState {
    First,
    Next(Cursor),
    Done,
}

/// Fetches pages of `P` one round trip at a time.
pub struct Pager<P> {
    pipeline: Pipeline,
    first: Request,
    state: PageState,
    _page: PhantomData<fn() -> P>,
}

impl<P: Paged> Pager<P> {
    pub fn new(pipeline: Pipeline, first: Request) -> Self {
        Self {
            pipeline,
            first,
            state: PageState::First,
            _page: PhantomData,
        }
    }

    /// Whether another page can be fetched.
    pub fn more(&self) -> bool {
        !matches!(self.state, PageState::Done)
    }

    /// Fetch the next page.
    pub async fn next_page(&mut self) -> Result<P, ClientError> {
        let request = match &self.state {
            PageState::Done => return Err(ClientError::NoMorePages),
            PageState::First => self.first.clone(),
            PageState::Next(Cursor::NextLink(link)) => Request::get(link)?.accept_json(),
            PageState::Next(Cursor::After(id)) => self.first.clone().with_query("after", id),
        };

        let resp = match self.pipeline.send(&request).await {
            Ok(resp) => resp,
            Err(e) => {
                self.state = PageState::Done;
                return Err(e);
            }
        };
        if !resp.has_status(&[200]) {
            self.state = PageState::Done;
            return Err(ResponseError::from_response(&resp).into());
        }

        let page: P = resp.json()?;
        self.state = match page.next_cursor() {
            Some(cursor) => PageState::Next(cursor),
            None => PageState::Done,
        };
        debug!(url = %request.url(), more = self.more(), "fetched page");
        Ok(page)
    }

    /// Fetch every remaining page and collect the items.
    pub async fn collect_all(mut self) -> Result<Vec<P::Item>, ClientError> {
        let mut items = Vec::new();
        while self.more() {
            items.extend(self.next_page().await?.into_items());
        }
        Ok(items)
    }

    /// Turn the pager into a stream of pages.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<P, ClientError>>
    where
        P: Send,
    {
        async_stream::stream! {
            while self.more() {
                let page = self.next_page().await;
                let failed = page.is_err();
                yield page;
                if failed {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    #[test]
    fn test_arm_list_next_cursor() {
        let page: ArmList<Named> = serde_json::from_str(
            r#"{"value":[{"name":"a"},{"name":"b"}],"nextLink":"https://h.com/next?page=2"}"#,
        )
        .unwrap();
        assert_eq!(
            page.next_cursor(),
            Some(Cursor::NextLink("https://h.com/next?page=2".into()))
        );
        let names: Vec<String> = page.into_items().into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_arm_list_last_page() {
        let page: ArmList<Named> = serde_json::from_str(r#"{"value":[]}"#).unwrap();
        assert!(page.next_cursor().is_none());

        let page: ArmList<Named> =
            serde_json::from_str(r#"{"value":[],"nextLink":""}"#).unwrap();
        assert!(page.next_cursor().is_none());

        let page: ArmList<Named> = serde_json::from_str(r#"{"nextLink":null}"#).unwrap();
        assert!(page.value.is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_pager_errors() {
        let pipeline = Pipeline::new(
            crate::pipeline::AuthPolicy::None,
            crate::pipeline::ClientOptions::default(),
        );
        let mut pager: Pager<ArmList<Named>> =
            Pager::new(pipeline, Request::get("https://h.com/list").unwrap());
        pager.state = PageState::Done;
        assert!(!pager.more());
        assert!(matches!(
            pager.next_page().await,
            Err(ClientError::NoMorePages)
        ));
    }
}
