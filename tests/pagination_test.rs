//! Integration tests for paged list consumption.

use parking_lot::Mutex;
use std::sync::Arc;
use terra_api::mocks::{MockResponse, MockSigner, MockTransport, TestFixtures};
use terra_api::pagination::{collect_pages, Page};
use terra_api::services::FilesService;
use terra_api::dispatch::Dispatcher;
use terra_api::types::{FileQuery, ListQuery, ResourceQuery};
use terra_api::TerraError;

fn numbered_page(page: u32, rows: u32, total: u64) -> Page<u64> {
    let start = u64::from((page - 1) * rows);
    let end = (start + u64::from(rows)).min(total);
    Page {
        list: (start..end).collect(),
        page,
        rows,
        total,
    }
}

#[tokio::test]
async fn test_collect_all_pages() {
    let requested = Mutex::new(Vec::new());

    let items = collect_pages(ResourceQuery::new().rows(10), None, |query| {
        requested.lock().push(query.current_page());
        async move { Ok::<_, TerraError>(numbered_page(query.current_page().unwrap(), 10, 25)) }
    })
    .await
    .unwrap();

    assert_eq!(items, (0..25).collect::<Vec<u64>>());
    assert_eq!(*requested.lock(), vec![Some(1), Some(2), Some(3)]);
}

#[tokio::test]
async fn test_collect_with_limit() {
    let requested = Mutex::new(0);

    let items = collect_pages(ResourceQuery::new().rows(10), Some(15), |query| {
        *requested.lock() += 1;
        async move { Ok::<_, TerraError>(numbered_page(query.current_page().unwrap(), 10, 100)) }
    })
    .await
    .unwrap();

    assert_eq!(items.len(), 15);
    assert_eq!(*requested.lock(), 2);
}

#[tokio::test]
async fn test_collect_starts_at_query_page() {
    let items = collect_pages(ResourceQuery::new().rows(10).page(3), None, |query| async move {
        Ok::<_, TerraError>(numbered_page(query.current_page().unwrap(), 10, 25))
    })
    .await
    .unwrap();

    assert_eq!(items, (20..25).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_collect_stops_on_empty_page() {
    let calls = Mutex::new(0);

    let items: Vec<u64> = collect_pages(ResourceQuery::new(), None, |query| {
        *calls.lock() += 1;
        async move {
            Ok::<_, TerraError>(Page {
                list: Vec::new(),
                page: query.current_page().unwrap(),
                rows: 10,
                total: 500,
            })
        }
    })
    .await
    .unwrap();

    assert!(items.is_empty());
    assert_eq!(*calls.lock(), 1);
}

#[tokio::test]
async fn test_collect_propagates_error() {
    let result: Result<Vec<u64>, TerraError> =
        collect_pages(ResourceQuery::new(), None, |query| async move {
            if query.current_page() == Some(2) {
                Err(TerraError::Job(terra_api::JobError::UnknownStatus(9)))
            } else {
                Ok(numbered_page(1, 10, 30))
            }
        })
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_collect_file_pages_through_service() {
    let files = |range: std::ops::Range<u32>| -> Vec<String> {
        range
            .map(|i| TestFixtures::file(&format!("file-{}", i), &format!("img_{}.jpg", i), ""))
            .collect()
    };
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::envelope(&TestFixtures::page(&files(0..2), 1, 2, 3)),
        MockResponse::envelope(&TestFixtures::page(&files(2..3), 2, 2, 3)),
    ]));
    let config = Arc::new(TestFixtures::config().unwrap());
    let dispatcher = Arc::new(Dispatcher::new(config, transport.clone(), Arc::new(MockSigner::new())));
    let service = FilesService::new(dispatcher);

    let query = FileQuery::new().rows(2).resource("res-1");
    let all = collect_pages(query, None, |q| {
        let service = &service;
        async move { service.list(&q).await }
    })
    .await
    .unwrap();

    assert_eq!(all.len(), 3);
    assert_eq!(all[2].uuid, "file-2");

    let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
    assert!(urls[0].contains("page=1"));
    assert!(urls[1].contains("page=2"));
    assert!(urls.iter().all(|u| u.contains("resourceUuid=res-1")));
}
