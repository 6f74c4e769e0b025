//! Chapter Analyze (§4.8.4): turn a chapter's prose into a [`ChapterAnalysis`] plus
//! the memory fragments [`crate::analysis`] derives from it.
//!
//! Runs inline on explicit request or as the background task chapter-generate
//! schedules. The state machine is `pending -> running -> completed|failed`, with
//! an auto-recovery rule applied whenever a caller queries task status.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::analysis::derive_fragments;
use crate::error::OrchestratorError;
use crate::llm::Message;
use crate::model::{
    now_millis, AnalysisTask, CharacterStateDelta, ChapterAnalysis, EmotionalBeat, Foreshadow, Hook, Pacing, PlotPoint, TaskStatus,
};
use crate::retry::strip_json_fences;
use crate::stream::EventEmitter;

use super::OrchestratorContext;

pub const ANALYSIS_RUNNING_TIMEOUT_SECS: i64 = 60;
pub const ANALYSIS_PENDING_TIMEOUT_SECS: i64 = 120;
const CONTENT_TRUNCATE_CHARS: usize = 8000;
const MEMORY_COMMIT_MAX_ATTEMPTS: u32 = 3;
const MEMORY_COMMIT_BACKOFF: Duration = Duration::from_millis(100);

pub struct ChapterAnalyzeRequest {
    pub tenant_id: String,
    pub project_id: String,
    pub chapter_id: String,
    pub task_id: String,
}

#[derive(Debug, Deserialize)]
struct RawConflict {
    level: u8,
}

#[derive(Debug, Deserialize)]
struct RawScores {
    overall: f32,
    pacing: f32,
    engagement: f32,
    coherence: f32,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    hooks: Vec<Hook>,
    foreshadows: Vec<Foreshadow>,
    plot_points: Vec<PlotPoint>,
    character_states: Vec<CharacterStateDelta>,
    conflict: RawConflict,
    emotional_arc: EmotionalBeat,
    #[serde(default)]
    scenes: Vec<serde_json::Value>,
    pacing: Pacing,
    scores: RawScores,
    #[serde(default)]
    suggestions: Vec<String>,
    plot_stage: String,
    dialogue_ratio: f32,
    description_ratio: f32,
}

/// Checks whether an in-flight task has overrun its allotted time and, if so,
/// marks it `failed` with the auto-recovery message. Called by any status query,
/// not just by this orchestrator.
pub fn apply_auto_recovery(task: &mut AnalysisTask, now_millis: i64) -> bool {
    let age_secs = (now_millis - task.updated_at) / 1000;
    let timed_out = match task.status {
        TaskStatus::Running => age_secs > ANALYSIS_RUNNING_TIMEOUT_SECS,
        TaskStatus::Queued => age_secs > ANALYSIS_PENDING_TIMEOUT_SECS,
        _ => false,
    };
    if timed_out {
        task.status = TaskStatus::Failed;
        task.last_error = Some("timeout, auto-recovered".to_string());
        task.updated_at = now_millis;
    }
    timed_out
}

pub async fn run_chapter_analyze(
    ctx: &OrchestratorContext,
    request: ChapterAnalyzeRequest,
    emitter: &EventEmitter,
) -> Result<serde_json::Value, OrchestratorError> {
    let handle = ctx.registry.acquire(&request.tenant_id).await.map_err(|e| OrchestratorError::Internal(e.to_string()))?;

    let chapter = handle
        .store
        .get_chapter(&request.project_id, &request.chapter_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("chapter {}", request.chapter_id)))?;

    let mut task = handle
        .store
        .get_analysis_task(&request.task_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("analysis task {}", request.task_id)))?;

    {
        let _guard = handle.write_lock().await;
        task.status = TaskStatus::Running;
        task.updated_at = now_millis();
        handle.store.update_analysis_task(task.clone()).await?;
    }
    emitter.progress("analysis running", 10).await;

    let truncated: String = chapter.content.chars().take(CONTENT_TRUNCATE_CHARS).collect();
    let prompt = ctx.composer.analysis(&chapter.title, &truncated);
    let response = ctx
        .llm
        .invoke(&[Message::user(prompt)])
        .await
        .map_err(OrchestratorError::from)?;

    let raw = match parse_analysis(&response.content) {
        Ok(raw) => raw,
        Err(first_err) => {
            let recovered = extract_largest_object(&response.content).and_then(|s| parse_analysis(&s).ok());
            match recovered {
                Some(raw) => raw,
                None => {
                    let _guard = handle.write_lock().await;
                    task.status = TaskStatus::Failed;
                    task.last_error = Some(format!("AnalysisParseError: {first_err}"));
                    task.updated_at = now_millis();
                    handle.store.update_analysis_task(task).await?;
                    return Err(OrchestratorError::ParseError(first_err));
                }
            }
        }
    };
    emitter.progress("analysis parsed", 60).await;

    let analysis = ChapterAnalysis {
        id: uuid::Uuid::new_v4().to_string(),
        project_id: request.project_id.clone(),
        chapter_id: request.chapter_id.clone(),
        plot_stage: raw.plot_stage,
        conflict_level: raw.conflict.level,
        emotional_tone: raw.emotional_arc.tone.clone(),
        emotional_intensity: raw.emotional_arc.intensity,
        hooks: raw.hooks,
        foreshadows: raw.foreshadows,
        plot_points: raw.plot_points,
        character_states: raw.character_states,
        pacing: raw.pacing,
        overall_quality_score: raw.scores.overall,
        pacing_score: raw.scores.pacing,
        engagement_score: raw.scores.engagement,
        coherence_score: raw.scores.coherence,
        analysis_report: format!(
            "{} chapter, conflict {}/10, tone {} ({:.2}).",
            raw.plot_stage, raw.conflict.level, raw.emotional_arc.tone, raw.emotional_arc.intensity
        ),
        suggestions: raw.suggestions,
        word_count: chapter.word_count,
        dialogue_ratio: raw.dialogue_ratio,
        description_ratio: raw.description_ratio,
        created_at: now_millis(),
    };
    let _ = &raw.scenes;

    {
        let _guard = handle.write_lock().await;
        handle.store.upsert_chapter_analysis(analysis.clone()).await?;
    }
    emitter.progress("analysis persisted", 80).await;

    let chapter_number = chapter.chapter_number as i64;
    let fragments = derive_fragments(&analysis, chapter_number, &chapter.content);

    let mut memory_index_consistent = true;
    for attempt in 0..MEMORY_COMMIT_MAX_ATTEMPTS {
        let outcome = {
            let _guard = handle.write_lock().await;
            commit_memory_fragments(&handle, &request.project_id, &fragments).await
        };
        match outcome {
            Ok(()) => break,
            Err(e) => {
                if attempt + 1 == MEMORY_COMMIT_MAX_ATTEMPTS {
                    tracing::warn!(error = %e, "memory index left inconsistent after exhausting retries");
                    memory_index_consistent = false;
                } else {
                    tokio::time::sleep(MEMORY_COMMIT_BACKOFF).await;
                }
            }
        }
    }

    {
        let _guard = handle.write_lock().await;
        task.status = TaskStatus::Succeeded;
        task.result_analysis_id = Some(analysis.id.clone());
        task.updated_at = now_millis();
        handle.store.update_analysis_task(task).await?;
    }

    emitter.progress("analysis complete", 100).await;
    let payload = json!({
        "analysis_id": analysis.id,
        "fragment_count": fragments.len(),
        "memory_index_consistent": memory_index_consistent,
    });
    emitter.result(payload.clone()).await;
    emitter.done().await;
    Ok(payload)
}

async fn commit_memory_fragments(
    handle: &crate::tenant::TenantHandle,
    project_id: &str,
    fragments: &[crate::model::MemoryFragment],
) -> Result<(), OrchestratorError> {
    use crate::memory::MemoryStore;

    handle.memory.add_batch(project_id, fragments.to_vec()).await?;
    Ok(())
}

fn parse_analysis(content: &str) -> Result<RawAnalysis, String> {
    let cleaned = strip_json_fences(content);
    serde_json::from_str(&cleaned).map_err(|e| e.to_string())
}

/// Fallback recovery step: finds the largest brace-delimited substring and hands
/// it back for one more parse attempt.
fn extract_largest_object(content: &str) -> Option<String> {
    let bytes = content.as_bytes();
    let mut best: Option<(usize, usize)> = None;
    let mut stack = Vec::new();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'{' {
            stack.push(i);
        } else if b == b'}' {
            if let Some(start) = stack.pop() {
                if stack.is_empty() {
                    let len = i - start;
                    if best.map(|(s, e)| e - s < len).unwrap_or(true) {
                        best = Some((start, i));
                    }
                }
            }
        }
    }
    best.map(|(start, end)| content[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_recovery_fails_long_running_task() {
        let mut task = AnalysisTask::new("t1", "p1", "c1");
        task.status = TaskStatus::Running;
        task.updated_at = 0;
        let now = (ANALYSIS_RUNNING_TIMEOUT_SECS + 5) * 1000;
        assert!(apply_auto_recovery(&mut task, now));
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[test]
    fn auto_recovery_leaves_fresh_running_task_alone() {
        let mut task = AnalysisTask::new("t1", "p1", "c1");
        task.status = TaskStatus::Running;
        task.updated_at = 0;
        let now = 5_000;
        assert!(!apply_auto_recovery(&mut task, now));
        assert_eq!(task.status, TaskStatus::Running);
    }

    #[test]
    fn auto_recovery_fails_stale_pending_task() {
        let mut task = AnalysisTask::new("t1", "p1", "c1");
        task.updated_at = 0;
        let now = (ANALYSIS_PENDING_TIMEOUT_SECS + 5) * 1000;
        assert!(apply_auto_recovery(&mut task, now));
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[test]
    fn extract_largest_object_finds_outermost_braces() {
        let text = "prose before {\"a\": {\"b\": 1}} prose after";
        let extracted = extract_largest_object(text).unwrap();
        assert_eq!(extracted, "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn extract_largest_object_none_when_no_braces() {
        assert!(extract_largest_object("no json here").is_none());
    }
}
