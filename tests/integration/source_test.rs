//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! SeaORM 数据源集成测试（内存 SQLite）

#[path = "../common/mod.rs"]
mod common;

use common::{insert_article, memory_source, seed_public, setup_logging, views_of};
use std::collections::HashMap;
use viewsync::database::ArticleSource;
use viewsync::model::ArticleStatus;
use viewsync::Error;

#[tokio::test]
async fn test_pagination_over_25_public_articles() {
    setup_logging();
    let source = memory_source().await;
    seed_public(&source, 25).await;
    insert_article(&source, 100, 0, ArticleStatus::Private, false).await;
    insert_article(&source, 101, 0, ArticleStatus::Public, true).await;

    let first = source.find_page(1, 10).await.unwrap();
    assert_eq!(first.articles.len(), 10);
    assert_eq!(first.total, 25);
    assert_eq!(
        first.articles.iter().map(|a| a.id).collect::<Vec<_>>(),
        (1..=10).collect::<Vec<_>>()
    );

    let third = source.find_page(3, 10).await.unwrap();
    assert_eq!(third.articles.len(), 5);
    assert_eq!(third.total, 25);
    assert_eq!(third.articles[0].id, 21);

    let beyond = source.find_page(4, 10).await.unwrap();
    assert!(beyond.articles.is_empty());
    assert_eq!(beyond.total, 25);
}

#[tokio::test]
async fn test_zero_page_is_invalid() {
    let source = memory_source().await;
    assert!(matches!(
        source.find_page(0, 10).await,
        Err(Error::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn test_out_of_range_page_is_invalid() {
    let source = memory_source().await;
    seed_public(&source, 2).await;
    for (page, size) in [(u64::MAX, 10), (u64::MAX / 2, 4)] {
        assert!(matches!(
            source.find_page(page, size).await,
            Err(Error::InvalidRequest(_))
        ));
    }
    // 偏移量合法但超出数据范围时返回空页
    let page = source.find_page(1_000_000, 10).await.unwrap();
    assert!(page.articles.is_empty());
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn test_popular_orders_by_views_then_id() {
    let source = memory_source().await;
    insert_article(&source, 1, 5, ArticleStatus::Public, false).await;
    insert_article(&source, 2, 9, ArticleStatus::Public, false).await;
    insert_article(&source, 3, 5, ArticleStatus::Public, false).await;
    insert_article(&source, 4, 50, ArticleStatus::Private, false).await;
    insert_article(&source, 5, 70, ArticleStatus::Public, true).await;
    insert_article(&source, 6, 1, ArticleStatus::Public, false).await;

    let popular = source.find_popular(3).await.unwrap();
    assert_eq!(
        popular.iter().map(|a| a.id).collect::<Vec<_>>(),
        vec![2, 1, 3]
    );
    assert_eq!(popular[0].views, 9);
}

#[tokio::test]
async fn test_find_by_id_ignores_visibility() {
    let source = memory_source().await;
    insert_article(&source, 7, 3, ArticleStatus::Private, true).await;

    let article = source.find_by_id(7).await.unwrap();
    assert_eq!(article.status, ArticleStatus::Private);
    assert!(article.is_delete);
    assert_eq!(article.content, "body of article 7");
    assert_eq!(article.desc, "description of 7");

    assert!(matches!(
        source.find_by_id(8).await,
        Err(Error::ArticleNotFound(8))
    ));
}

#[tokio::test]
async fn test_find_by_ids_sorted_and_skips_missing() {
    let source = memory_source().await;
    seed_public(&source, 5).await;

    let found = source.find_by_ids(&[4, 2, 99]).await.unwrap();
    assert_eq!(found.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 4]);
    assert!(source.find_by_ids(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_public_ids_applies_visibility() {
    let source = memory_source().await;
    seed_public(&source, 3).await;
    insert_article(&source, 10, 0, ArticleStatus::Private, false).await;
    insert_article(&source, 11, 0, ArticleStatus::Public, true).await;

    assert_eq!(source.list_public_ids().await.unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_increment_adds_to_existing_views() {
    let source = memory_source().await;
    insert_article(&source, 1, 10, ArticleStatus::Public, false).await;

    source.increment_views(1, 5).await.unwrap();
    source.increment_views(1, 0).await.unwrap();
    assert_eq!(views_of(&source, 1).await, 15);

    assert!(matches!(
        source.increment_views(2, 1).await,
        Err(Error::ArticleNotFound(2))
    ));
}

#[tokio::test]
async fn test_batch_increment_commits_all() {
    let source = memory_source().await;
    seed_public(&source, 3).await;

    let deltas = HashMap::from([(1, 4), (2, 6), (3, 1)]);
    source.increment_views_batch(&deltas).await.unwrap();

    assert_eq!(views_of(&source, 1).await, 4);
    assert_eq!(views_of(&source, 2).await, 6);
    assert_eq!(views_of(&source, 3).await, 1);
}

#[tokio::test]
async fn test_batch_increment_rolls_back_on_missing_row() {
    let source = memory_source().await;
    seed_public(&source, 2).await;

    let deltas = HashMap::from([(1, 4), (2, 6), (404, 1)]);
    let err = source.increment_views_batch(&deltas).await.unwrap_err();
    assert!(matches!(err, Error::ArticleNotFound(404)));

    assert_eq!(views_of(&source, 1).await, 0);
    assert_eq!(views_of(&source, 2).await, 0);
}
