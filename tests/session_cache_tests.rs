// Integration tests for the in-flight session cache: lookup contract,
// FIFO eviction, idle sweep, placeholder registration, drain waiting.

use anyhow::Result;
use interview_speech::error::SpeechError;
use interview_speech::session::{
    ChunkState, CompletedChunk, DrainOutcome, IngestSession, SessionCache,
};
use std::sync::Arc;
use std::time::Duration;

fn completed(duration: f64) -> CompletedChunk {
    CompletedChunk {
        audio_url: format!("memory://test/{duration}"),
        speakers: Vec::new(),
        duration,
    }
}

#[tokio::test]
async fn test_put_get_delete_roundtrip() {
    let cache = SessionCache::new(10);
    let session = IngestSession::new("canvas-1", "mentor-1", "mentee-1", 0);
    let key = session.session_key.clone();

    cache.put(session).await;
    assert!(cache.get(&key).await.is_some());
    assert!(cache.delete(&key).await);
    assert!(cache.get(&key).await.is_none());
    assert!(!cache.delete(&key).await);
}

#[tokio::test]
async fn test_session_key_embeds_canvas() {
    let session = IngestSession::new("canvas-7", "m1", "m2", 0);
    assert!(session.session_key.starts_with("canvas-7-"));
}

#[tokio::test]
async fn test_find_active_requires_chunks() {
    let cache = SessionCache::new(10);

    let empty = IngestSession::new("canvas-1", "m1", "m2", 0);
    cache.put(empty).await;
    assert_eq!(cache.find_active("canvas-1").await, None);

    let mut busy = IngestSession::new("canvas-1", "m1", "m2", 1);
    busy.chunks.insert(0, ChunkState::Processing);
    let busy_key = busy.session_key.clone();
    cache.put(busy).await;

    assert_eq!(cache.find_active("canvas-1").await, Some(busy_key));
}

#[tokio::test]
async fn test_find_all_and_max_segment_index() {
    let cache = SessionCache::new(10);
    cache.put(IngestSession::new("canvas-1", "m1", "m2", 0)).await;
    cache.put(IngestSession::new("canvas-1", "m1", "m2", 3)).await;
    cache.put(IngestSession::new("canvas-2", "m1", "m2", 9)).await;

    assert_eq!(cache.find_all("canvas-1").await.len(), 2);
    assert_eq!(cache.max_segment_index("canvas-1").await, Some(3));
    assert_eq!(cache.max_segment_index("canvas-3").await, None);
}

#[tokio::test]
async fn test_fifo_eviction_at_capacity() {
    let cache = SessionCache::new(2);

    let first = IngestSession::new("canvas-a", "m1", "m2", 0);
    let first_key = first.session_key.clone();
    cache.put(first).await;
    cache.put(IngestSession::new("canvas-b", "m1", "m2", 0)).await;
    cache.put(IngestSession::new("canvas-c", "m1", "m2", 0)).await;

    assert_eq!(cache.len().await, 2);
    assert!(
        cache.get(&first_key).await.is_none(),
        "oldest entry should be evicted first"
    );
}

#[tokio::test]
async fn test_idle_sweep_removes_stale_sessions() {
    let cache = SessionCache::new(10);
    let session = IngestSession::new("canvas-1", "m1", "m2", 0);
    cache.put(session).await;

    tokio::time::sleep(Duration::from_millis(50)).await;

    // Generous threshold keeps it; tight threshold sweeps it.
    assert_eq!(cache.sweep_idle(Duration::from_secs(60)).await, 0);
    assert_eq!(cache.sweep_idle(Duration::from_millis(10)).await, 1);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_register_creates_session_on_first_chunk() -> Result<()> {
    let cache = SessionCache::new(10);

    let slot = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await?;
    assert!(slot.created);
    assert_eq!(slot.segment_index, 0);

    let session = cache.get(&slot.session_key).await.expect("session exists");
    assert!(matches!(session.chunks.get(&0), Some(ChunkState::Processing)));
    Ok(())
}

#[tokio::test]
async fn test_register_reuses_active_session() -> Result<()> {
    let cache = SessionCache::new(10);

    let first = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await?;
    let second = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 1)
        .await?;

    assert!(!second.created);
    assert_eq!(first.session_key, second.session_key);
    Ok(())
}

#[tokio::test]
async fn test_restart_bumps_segment_index_not_key() -> Result<()> {
    let cache = SessionCache::new(10);

    let first = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await?;
    let restarted = cache
        .resolve_and_register("canvas-1", "m1", "m2", true, 1)
        .await?;

    assert_eq!(first.session_key, restarted.session_key);
    assert_eq!(restarted.segment_index, first.segment_index + 1);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_processing_chunk_rejected() -> Result<()> {
    let cache = SessionCache::new(10);

    cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await?;
    let duplicate = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await;

    assert!(matches!(duplicate, Err(SpeechError::ChunkInFlight { .. })));
    Ok(())
}

#[tokio::test]
async fn test_finalizing_session_rejects_new_chunks() -> Result<()> {
    let cache = SessionCache::new(10);

    cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await?;
    assert_eq!(cache.begin_finalize("canvas-1").await, 1);

    let late = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 1)
        .await;
    assert!(matches!(late, Err(SpeechError::Finalizing { .. })));
    Ok(())
}

#[tokio::test]
async fn test_completed_offset_sums_prior_chunks() -> Result<()> {
    let cache = SessionCache::new(10);
    let slot = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await?;
    let key = slot.session_key;

    cache.complete_chunk(&key, 0, completed(10.0)).await?;
    cache.resolve_and_register("canvas-1", "m1", "m2", false, 1).await?;
    cache.complete_chunk(&key, 1, completed(12.0)).await?;

    assert_eq!(cache.completed_offset(&key, 0).await?, 0.0);
    assert_eq!(cache.completed_offset(&key, 1).await?, 10.0);
    assert_eq!(cache.completed_offset(&key, 2).await?, 22.0);
    Ok(())
}

#[tokio::test]
async fn test_offset_skips_processing_chunks() -> Result<()> {
    let cache = SessionCache::new(10);
    let slot = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await?;
    let key = slot.session_key;

    // Chunk 0 still processing, chunk 1 complete.
    cache.resolve_and_register("canvas-1", "m1", "m2", false, 1).await?;
    cache.complete_chunk(&key, 1, completed(12.0)).await?;

    assert_eq!(cache.completed_offset(&key, 2).await?, 12.0);
    Ok(())
}

#[tokio::test]
async fn test_remove_chunk_leaves_no_trace() -> Result<()> {
    let cache = SessionCache::new(10);
    let slot = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await?;

    cache.remove_chunk(&slot.session_key, 0).await;
    let session = cache.get(&slot.session_key).await.expect("session stays");
    assert!(session.chunks.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_drain_returns_immediately_when_no_processing() -> Result<()> {
    let cache = SessionCache::new(10);
    let slot = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await?;
    cache.complete_chunk(&slot.session_key, 0, completed(5.0)).await?;

    let outcome = cache
        .wait_for_drain(
            "canvas-1",
            Duration::from_millis(10),
            Duration::from_secs(5),
        )
        .await;
    assert_eq!(outcome, DrainOutcome::Drained { complete: 1 });
    Ok(())
}

#[tokio::test]
async fn test_drain_empty_when_nothing_completes() -> Result<()> {
    let cache = SessionCache::new(10);
    cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await?;

    let outcome = cache
        .wait_for_drain(
            "canvas-1",
            Duration::from_millis(20),
            Duration::from_millis(200),
        )
        .await;
    assert_eq!(outcome, DrainOutcome::Empty);
    Ok(())
}

#[tokio::test]
async fn test_drain_accepts_partial_after_most_of_wait() -> Result<()> {
    let cache = SessionCache::new(10);
    let slot = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await?;
    let key = slot.session_key;
    cache.complete_chunk(&key, 0, completed(5.0)).await?;
    // Chunk 1 never finishes.
    cache.resolve_and_register("canvas-1", "m1", "m2", false, 1).await?;

    let start = tokio::time::Instant::now();
    let outcome = cache
        .wait_for_drain(
            "canvas-1",
            Duration::from_millis(20),
            Duration::from_millis(500),
        )
        .await;

    assert_eq!(
        outcome,
        DrainOutcome::Partial {
            processing: 1,
            complete: 1
        }
    );
    // Accepted at ~80% of the budget, not the full wait.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(380), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(500), "elapsed {:?}", elapsed);
    Ok(())
}

#[tokio::test]
async fn test_drain_wakes_on_completion_signal() -> Result<()> {
    let cache = Arc::new(SessionCache::new(10));
    let slot = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 0)
        .await?;
    let key = slot.session_key;

    let background = Arc::clone(&cache);
    let background_key = key.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        background
            .complete_chunk(&background_key, 0, completed(5.0))
            .await
            .ok();
    });

    let start = tokio::time::Instant::now();
    let outcome = cache
        .wait_for_drain("canvas-1", Duration::from_secs(5), Duration::from_secs(30))
        .await;

    assert_eq!(outcome, DrainOutcome::Drained { complete: 1 });
    // Woken by the completion signal, long before the first interval tick.
    assert!(start.elapsed() < Duration::from_secs(2));
    Ok(())
}

#[tokio::test]
async fn test_collect_complete_sorted_by_chunk_index() -> Result<()> {
    let cache = SessionCache::new(10);
    let slot = cache
        .resolve_and_register("canvas-1", "m1", "m2", false, 2)
        .await?;
    let key = slot.session_key;
    cache.complete_chunk(&key, 2, completed(8.0)).await?;
    cache.resolve_and_register("canvas-1", "m1", "m2", false, 0).await?;
    cache.complete_chunk(&key, 0, completed(10.0)).await?;
    cache.resolve_and_register("canvas-1", "m1", "m2", false, 1).await?;
    cache.complete_chunk(&key, 1, completed(12.0)).await?;

    let chunks = cache.collect_complete("canvas-1").await;
    let indices: Vec<u32> = chunks.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    Ok(())
}

#[tokio::test]
async fn test_delete_canvas_clears_all_sessions() {
    let cache = SessionCache::new(10);
    cache.put(IngestSession::new("canvas-1", "m1", "m2", 0)).await;
    cache.put(IngestSession::new("canvas-1", "m1", "m2", 1)).await;
    cache.put(IngestSession::new("canvas-2", "m1", "m2", 0)).await;

    assert_eq!(cache.delete_canvas("canvas-1").await, 2);
    assert_eq!(cache.len().await, 1);
    assert!(cache.find_all("canvas-1").await.is_empty());
}
