use riftparlay::{
    CircuitRegistry, CircuitSnapshot, Ciphertext, EntropySource, EntryProof, Error, ErrorKind,
    Event, MemStore, Outcome, ParticipantId, ProofVerifier, Timestamp, VoteCounts,
};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[macro_use]
extern crate rocket;

mod config;

pub struct AppState {
    engine: CircuitRegistry<MemStore>,
    verifier: Box<dyn ProofVerifier + Send + Sync>,
    entropy: Box<dyn EntropySource + Send + Sync>,
}

/// Wall-clock time enters the system here and nowhere else; the engine only
/// ever sees the sampled value.
fn unix_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs()
}

#[derive(Serialize, Debug, Clone)]
pub struct ApiError {
    pub error: String,
    pub code: &'static str,
    pub kind: ErrorKind,
}

type ApiResult<T> = Result<Json<T>, (Status, Json<ApiError>)>;

fn fail<T>(err: Error) -> Result<T, (Status, Json<ApiError>)> {
    let status = match err.kind() {
        ErrorKind::NotFound => Status::NotFound,
        ErrorKind::Authorization => Status::Forbidden,
        ErrorKind::Validation => Status::UnprocessableEntity,
        ErrorKind::Conflict | ErrorKind::TemporalGuard | ErrorKind::TerminalState => {
            Status::Conflict
        }
    };
    Err((
        status,
        Json(ApiError {
            error: err.to_string(),
            code: err.code(),
            kind: err.kind(),
        }),
    ))
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreateRequest {
    pub circuit_id: String,
    pub headline: String,
    pub creator: ParticipantId,
    pub duration_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct EnterRequest {
    pub participant: ParticipantId,
    pub ciphertext: Ciphertext,
    pub proof: EntryProof,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TallyRequest {
    pub votes: VoteCounts,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CancelRequest {
    pub caller: ParticipantId,
}

#[post("/api/circuit", data = "<req>")]
fn create(state: &State<AppState>, req: Json<CreateRequest>) -> ApiResult<CircuitSnapshot> {
    let req = req.into_inner();
    match state.engine.create(
        &req.circuit_id,
        &req.headline,
        req.creator,
        req.duration_secs,
        unix_now(),
    ) {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(err) => fail(err),
    }
}

#[get("/api/circuits")]
fn list(state: &State<AppState>) -> Json<Vec<String>> {
    Json(state.engine.list_ids())
}

#[get("/api/circuit/<id>")]
fn get_circuit(state: &State<AppState>, id: &str) -> ApiResult<CircuitSnapshot> {
    match state.engine.get(id) {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(err) => fail(err),
    }
}

#[get("/api/circuit/<id>/entrants")]
fn entrants(state: &State<AppState>, id: &str) -> ApiResult<Vec<ParticipantId>> {
    match state.engine.entrants(id) {
        Ok(entrants) => Ok(Json(entrants)),
        Err(err) => fail(err),
    }
}

#[get("/api/circuit/<id>/entered/<participant>")]
fn has_entered(state: &State<AppState>, id: &str, participant: &str) -> ApiResult<bool> {
    match state
        .engine
        .has_entered(id, &ParticipantId::from(participant))
    {
        Ok(entered) => Ok(Json(entered)),
        Err(err) => fail(err),
    }
}

#[get("/api/circuit/<id>/choice/<participant>")]
fn encrypted_choice(state: &State<AppState>, id: &str, participant: &str) -> ApiResult<Ciphertext> {
    match state
        .engine
        .encrypted_choice(id, &ParticipantId::from(participant))
    {
        Ok(ciphertext) => Ok(Json(ciphertext)),
        Err(err) => fail(err),
    }
}

#[post("/api/circuit/<id>/enter", data = "<req>")]
fn enter(state: &State<AppState>, id: &str, req: Json<EnterRequest>) -> ApiResult<CircuitSnapshot> {
    let req = req.into_inner();
    if let Err(err) = state.engine.enter(
        id,
        req.participant,
        req.ciphertext,
        &req.proof,
        &state.verifier,
        unix_now(),
    ) {
        return fail(err);
    }
    match state.engine.get(id) {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(err) => fail(err),
    }
}

#[post("/api/circuit/<id>/reveal")]
fn request_reveal(state: &State<AppState>, id: &str) -> ApiResult<CircuitSnapshot> {
    if let Err(err) = state.engine.request_reveal(id, unix_now()) {
        return fail(err);
    }
    match state.engine.get(id) {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(err) => fail(err),
    }
}

#[post("/api/circuit/<id>/tally", data = "<req>")]
fn submit_tally(state: &State<AppState>, id: &str, req: Json<TallyRequest>) -> ApiResult<CircuitSnapshot> {
    if let Err(err) = state.engine.submit_tally(id, req.votes, unix_now()) {
        return fail(err);
    }
    match state.engine.get(id) {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(err) => fail(err),
    }
}

#[post("/api/circuit/<id>/settle")]
fn settle(state: &State<AppState>, id: &str) -> ApiResult<Outcome> {
    match state.engine.settle(id, &state.entropy, unix_now()) {
        Ok(outcome) => Ok(Json(outcome)),
        Err(err) => fail(err),
    }
}

#[post("/api/circuit/<id>/cancel", data = "<req>")]
fn cancel(state: &State<AppState>, id: &str, req: Json<CancelRequest>) -> ApiResult<CircuitSnapshot> {
    if let Err(err) = state.engine.cancel(id, &req.caller, unix_now()) {
        return fail(err);
    }
    match state.engine.get(id) {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(err) => fail(err),
    }
}

#[get("/api/events")]
fn events(state: &State<AppState>) -> Json<Vec<Event>> {
    Json(state.engine.events())
}

#[get("/api/circuit/<id>/events")]
fn circuit_events(state: &State<AppState>, id: &str) -> Json<Vec<Event>> {
    Json(state.engine.events_for(id))
}

#[launch]
fn rocket() -> _ {
    let config = config::Config::from_env();
    let state = AppState {
        engine: CircuitRegistry::in_memory(),
        verifier: config.verifier(),
        entropy: config.entropy(),
    };

    rocket::build().manage(state).mount(
        "/",
        routes![
            create,
            list,
            get_circuit,
            entrants,
            has_entered,
            encrypted_choice,
            enter,
            request_reveal,
            submit_tally,
            settle,
            cancel,
            events,
            circuit_events
        ],
    )
}
