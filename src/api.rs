use rocket::State;
use rocket::data::{Data, ToByteUnit};
use rocket::http::{ContentType, Status};
use rocket::serde::{Deserialize, Serialize, json::Json};
use tracing::info;
use validator::Validate;

use crate::error::AppError;
use crate::models::{
    CompletionCategory, CompletionOutcome, Note, QuizOutcome, SandboxDocument, SkillScore,
    UserStats,
};
use crate::progress::{
    Achievement, AchievementStatus, ActivityDay, DEFAULT_HEATMAP_WEEKS, LevelSummary,
    ProgressEngine, StreakUpdate, calculate_level,
};
use crate::validation::{
    AppErrorExt, ITEM_ID, JsonValidateExt, ToValidationResponse, ValidationResult,
    validate_item_id,
};

const MAX_HEATMAP_WEEKS: u32 = 52;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[get("/health")]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub stats: UserStats,
    pub level: LevelSummary,
}

#[get("/stats")]
pub async fn api_get_stats(engine: &State<ProgressEngine>) -> Json<StatsResponse> {
    let stats = engine.user_stats().await;
    let level = engine.level_summary().await;

    Json(StatsResponse { stats, level })
}

#[derive(Deserialize, Validate)]
pub struct AddXpRequest {
    #[validate(range(min = 1, max = 100000, message = "Amount must be between 1 and 100000"))]
    amount: u64,
}

#[derive(Serialize, Deserialize)]
pub struct XpResponse {
    pub level: LevelSummary,
    pub level_up: Option<u64>,
}

#[post("/xp", data = "<request>")]
pub async fn api_add_xp(
    request: Json<AddXpRequest>,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<XpResponse>> {
    let validated = request.validate_custom()?;

    let before = calculate_level(engine.xp().await);
    let total = engine.add_xp(validated.amount).await.validate_custom()?;
    let level = LevelSummary::for_xp(total);
    let level_up = (level.level > before).then_some(level.level);

    Ok(Json(XpResponse { level, level_up }))
}

#[derive(Serialize, Deserialize)]
pub struct VisitResponse {
    pub streak: StreakUpdate,
    pub activity_today: u64,
}

/// Called once per page load: advances the streak and counts the visit.
#[post("/streak")]
pub async fn api_record_visit(engine: &State<ProgressEngine>) -> Json<VisitResponse> {
    let streak = engine.update_streak().await;
    let activity_today = engine.log_activity().await;

    Json(VisitResponse {
        streak,
        activity_today,
    })
}

#[get("/achievements")]
pub async fn api_get_achievements(engine: &State<ProgressEngine>) -> Json<Vec<AchievementStatus>> {
    Json(engine.achievement_board().await)
}

#[post("/achievements/check")]
pub async fn api_check_achievements(
    engine: &State<ProgressEngine>,
) -> Json<Vec<&'static Achievement>> {
    Json(engine.check_and_unlock_achievements().await)
}

#[derive(Serialize, Deserialize)]
pub struct UnlockResponse {
    pub id: String,
    pub newly_unlocked: bool,
}

#[post("/achievements/<id>")]
pub async fn api_unlock_achievement(
    id: &str,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<UnlockResponse>> {
    validate_item_id("id", id)?;
    let newly_unlocked = engine.unlock_achievement(id).await.validate_custom()?;

    Ok(Json(UnlockResponse {
        id: id.to_string(),
        newly_unlocked,
    }))
}

fn parse_category(category: &str) -> Result<CompletionCategory, Status> {
    category.parse().map_err(|e: String| {
        AppError::NotFound(e).to_status_with_log("Parsing completion category")
    })
}

#[get("/completions/<category>")]
pub async fn api_get_completions(
    category: &str,
    engine: &State<ProgressEngine>,
) -> Result<Json<Vec<String>>, Status> {
    let category = parse_category(category)?;

    Ok(Json(engine.completed(category).await))
}

#[derive(Serialize, Deserialize)]
pub struct CompletionStatus {
    pub category: CompletionCategory,
    pub id: String,
    pub completed: bool,
}

#[get("/completions/<category>/<id>")]
pub async fn api_get_completion(
    category: &str,
    id: &str,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<CompletionStatus>> {
    let category = parse_category(category).map_err(|s| s.to_validation_response())?;
    validate_item_id("id", id)?;

    Ok(Json(CompletionStatus {
        category,
        id: id.to_string(),
        completed: engine.is_completed(category, id).await,
    }))
}

#[derive(Deserialize, Validate)]
pub struct CompletionRequest {
    #[validate(regex(path = *ITEM_ID, message = "Invalid identifier"))]
    id: String,
    #[serde(default)]
    #[validate(range(max = 10000, message = "XP reward must be at most 10000"))]
    xp: u64,
}

#[post("/completions/<category>", data = "<request>")]
pub async fn api_complete_item(
    category: &str,
    request: Json<CompletionRequest>,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<CompletionOutcome>> {
    let category = parse_category(category).map_err(|s| s.to_validation_response())?;
    let validated = request.validate_custom()?;

    Ok(Json(
        engine
            .complete_with_reward(category, &validated.id, validated.xp)
            .await,
    ))
}

#[derive(Deserialize, Validate)]
pub struct QuizAttemptRequest {
    #[validate(regex(path = *ITEM_ID, message = "Invalid identifier"))]
    quiz_id: String,
    score: u32,
    #[validate(range(min = 1, max = 1000, message = "Question count must be between 1 and 1000"))]
    question_count: u32,
    #[serde(default)]
    #[validate(range(max = 10000, message = "XP reward must be at most 10000"))]
    xp: u64,
}

#[post("/quizzes/attempts", data = "<request>")]
pub async fn api_record_quiz_attempt(
    request: Json<QuizAttemptRequest>,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<QuizOutcome>> {
    let validated = request.validate_custom()?;

    let outcome = engine
        .record_quiz_attempt(
            &validated.quiz_id,
            validated.score,
            validated.question_count,
            validated.xp,
        )
        .await
        .validate_custom()?;

    Ok(Json(outcome))
}

#[get("/bookmarks")]
pub async fn api_get_bookmarks(engine: &State<ProgressEngine>) -> Json<Vec<String>> {
    Json(engine.bookmarks().await)
}

#[derive(Deserialize, Validate)]
pub struct BookmarkRequest {
    #[validate(regex(path = *ITEM_ID, message = "Invalid identifier"))]
    id: String,
}

#[derive(Serialize, Deserialize)]
pub struct BookmarkResponse {
    pub id: String,
    pub bookmarked: bool,
    pub changed: bool,
}

#[post("/bookmarks", data = "<request>")]
pub async fn api_add_bookmark(
    request: Json<BookmarkRequest>,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<BookmarkResponse>> {
    let validated = request.validate_custom()?;
    let changed = engine.add_bookmark(&validated.id).await;

    Ok(Json(BookmarkResponse {
        id: validated.id,
        bookmarked: true,
        changed,
    }))
}

#[get("/bookmarks/<id>")]
pub async fn api_get_bookmark(
    id: &str,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<BookmarkResponse>> {
    validate_item_id("id", id)?;

    Ok(Json(BookmarkResponse {
        id: id.to_string(),
        bookmarked: engine.is_bookmarked(id).await,
        changed: false,
    }))
}

#[delete("/bookmarks/<id>")]
pub async fn api_remove_bookmark(
    id: &str,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<BookmarkResponse>> {
    validate_item_id("id", id)?;
    let changed = engine.remove_bookmark(id).await;

    Ok(Json(BookmarkResponse {
        id: id.to_string(),
        bookmarked: false,
        changed,
    }))
}

#[derive(Serialize, Deserialize)]
pub struct CodeResponse {
    pub code: String,
    pub document: SandboxDocument,
}

#[get("/code")]
pub async fn api_get_code(engine: &State<ProgressEngine>) -> Json<CodeResponse> {
    Json(CodeResponse {
        code: engine.saved_code().await,
        document: engine.sandbox_document().await,
    })
}

#[derive(Deserialize, Validate)]
pub struct SaveCodeRequest {
    #[validate(length(max = 500000, message = "Saved code is too large"))]
    code: Option<String>,
    document: Option<SandboxDocument>,
}

#[put("/code", data = "<request>")]
pub async fn api_save_code(
    request: Json<SaveCodeRequest>,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Status> {
    let validated = request.validate_custom()?;

    match (validated.code, validated.document) {
        (Some(code), None) => engine.save_code(&code).await,
        (None, Some(document)) => engine.save_sandbox_document(&document).await,
        _ => {
            return Err(AppError::Validation(
                "Provide exactly one of `code` or `document`".to_string(),
            )
            .to_validation_response());
        }
    }

    Ok(Status::NoContent)
}

#[get("/notes")]
pub async fn api_get_notes(engine: &State<ProgressEngine>) -> Json<Vec<Note>> {
    Json(engine.notes().await)
}

#[derive(Deserialize, Validate)]
pub struct NoteRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    title: String,
    #[validate(length(max = 20000, message = "Note is too long"))]
    content: String,
}

#[post("/notes", data = "<request>")]
pub async fn api_add_note(
    request: Json<NoteRequest>,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<Note>> {
    let validated = request.validate_custom()?;

    Ok(Json(
        engine.add_note(&validated.title, &validated.content).await,
    ))
}

#[delete("/notes/<id>")]
pub async fn api_delete_note(id: i64, engine: &State<ProgressEngine>) -> Result<Status, Status> {
    if engine.delete_note(id).await {
        Ok(Status::NoContent)
    } else {
        Err(AppError::NotFound(format!("Note {}", id)).to_status_with_log("Deleting note"))
    }
}

#[get("/skills")]
pub async fn api_get_skills(engine: &State<ProgressEngine>) -> Json<Vec<SkillScore>> {
    Json(engine.skill_radar().await)
}

#[derive(Deserialize, Validate)]
pub struct SkillRequest {
    #[validate(regex(path = *ITEM_ID, message = "Invalid identifier"))]
    skill: String,
    #[validate(range(min = 1, max = 10000, message = "Points must be between 1 and 10000"))]
    points: u64,
}

#[derive(Serialize, Deserialize)]
pub struct SkillResponse {
    pub skill: String,
    pub value: u64,
}

#[post("/skills", data = "<request>")]
pub async fn api_add_skill_points(
    request: Json<SkillRequest>,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<SkillResponse>> {
    let validated = request.validate_custom()?;
    let skill = validated.skill.to_ascii_lowercase();
    let value = engine.add_skill_points(&skill, validated.points).await;

    Ok(Json(SkillResponse { skill, value }))
}

#[get("/learning-paths")]
pub async fn api_get_learning_paths(
    engine: &State<ProgressEngine>,
) -> Json<std::collections::BTreeMap<String, u64>> {
    Json(engine.learning_path_progress().await)
}

#[derive(Deserialize, Validate)]
pub struct LearningPathRequest {
    #[validate(regex(path = *ITEM_ID, message = "Invalid identifier"))]
    path_id: String,
    #[validate(range(max = 1000, message = "Step must be at most 1000"))]
    step: u64,
}

#[derive(Serialize, Deserialize)]
pub struct LearningPathResponse {
    pub path_id: String,
    pub step: u64,
}

#[post("/learning-paths", data = "<request>")]
pub async fn api_record_learning_path_step(
    request: Json<LearningPathRequest>,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<LearningPathResponse>> {
    let validated = request.validate_custom()?;
    let step = engine
        .record_learning_path_step(&validated.path_id, validated.step)
        .await;

    Ok(Json(LearningPathResponse {
        path_id: validated.path_id,
        step,
    }))
}

#[derive(Serialize, Deserialize)]
pub struct ActivityResponse {
    pub today: u64,
}

#[post("/activity")]
pub async fn api_log_activity(engine: &State<ProgressEngine>) -> Json<ActivityResponse> {
    Json(ActivityResponse {
        today: engine.log_activity().await,
    })
}

#[get("/activity?<weeks>")]
pub async fn api_get_activity(
    weeks: Option<u32>,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<Vec<ActivityDay>>> {
    let weeks = weeks.unwrap_or(DEFAULT_HEATMAP_WEEKS);
    if weeks == 0 || weeks > MAX_HEATMAP_WEEKS {
        return Err(AppError::Validation(format!(
            "weeks must be between 1 and {}",
            MAX_HEATMAP_WEEKS
        ))
        .to_validation_response());
    }

    Ok(Json(engine.activity_window(weeks).await))
}

#[get("/progress/export")]
pub async fn api_export_progress(
    engine: &State<ProgressEngine>,
) -> Result<(ContentType, String), Status> {
    let document = engine.export_progress().await?;

    Ok((ContentType::JSON, document))
}

#[derive(Serialize, Deserialize)]
pub struct ImportResponse {
    pub imported: bool,
    pub stats: UserStats,
}

#[post("/progress/import", data = "<data>")]
pub async fn api_import_progress(
    data: Data<'_>,
    engine: &State<ProgressEngine>,
) -> ValidationResult<Json<ImportResponse>> {
    let text = data
        .open(2.mebibytes())
        .into_string()
        .await
        .map_err(|e| AppError::InvalidImport(e.to_string()).to_validation_response())?;

    if !text.is_complete() {
        return Err(
            AppError::InvalidImport("progress file is too large".to_string())
                .to_validation_response(),
        );
    }

    engine.import_progress(&text).await.validate_custom()?;
    info!("Progress file imported");

    Ok(Json(ImportResponse {
        imported: true,
        stats: engine.user_stats().await,
    }))
}

#[delete("/progress")]
pub async fn api_reset_progress(engine: &State<ProgressEngine>) -> Status {
    engine.reset_progress().await;
    Status::NoContent
}
