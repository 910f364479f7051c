//! # Chain 2048 WebAssembly Bindings
//!
//! JavaScript-friendly bindings to the commitment engine using wasm-bindgen.
//! The browser UI drives moves through [`WasmGame`], renders the returned
//! tiles and annotations, and hands the encoded boards and calldata to its
//! wallet layer.

use chain_2048_core::contract::{self, decode_board_read};
use chain_2048_core::{
    Direction, EncodedMove, EngineConfig, GameEngine, GameStatus, InputError, MoveAnnotations, SessionId,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsTile {
    pub id: u64,
    pub value: u32,
    pub row: u8,
    pub col: u8,
    /// Spawned by the last move (or rebuilt by a resync).
    pub is_new: bool,
    /// Ids of the two tiles merged into this one on the last move.
    pub merged_from: Option<[u64; 2]>,
}

/// Game state after an operation, serialized for JavaScript.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsStepResult {
    /// Tile values, 16 elements in row-major order, 0 for empty.
    pub board: Vec<u32>,
    pub tiles: Vec<JsTile>,
    pub score: u64,
    /// Points earned from this move.
    pub gained: u64,
    /// Whether the board changed.
    pub moved: bool,
    pub reached_win: bool,
    /// "idle", "inProgress" or "over".
    pub status: &'static str,
    /// Hex commitment appended by this move, if any.
    pub encoded: Option<String>,
    pub next_move_index: u64,
}

/// WebAssembly wrapper around [`GameEngine`].
#[wasm_bindgen]
pub struct WasmGame {
    engine: GameEngine,
    rng: SmallRng,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create an idle engine, optionally from a YAML configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(config_yaml: Option<String>) -> Result<WasmGame, JsError> {
        let config = match config_yaml {
            Some(yaml) => EngineConfig::from_yaml(&yaml)?,
            None => EngineConfig::default(),
        };
        Ok(WasmGame {
            engine: GameEngine::new(config),
            rng: SmallRng::from_entropy(),
        })
    }

    /// Start a new game. Without a session id a random one is drawn; with a
    /// player address one is derived from it.
    #[wasm_bindgen(js_name = newGame)]
    pub fn new_game(&mut self, session: Option<String>, player: Option<String>) -> Result<JsValue, JsError> {
        let session = match (session, player) {
            (Some(hex), _) => hex.parse::<SessionId>()?,
            (None, Some(player)) => SessionId::for_player(&player, &mut self.rng)?,
            (None, None) => SessionId::random(&mut self.rng),
        };
        let board = self.engine.initialize(session)?;
        let annotations = MoveAnnotations {
            spawned: board.tiles().map(|t| t.id).collect(),
            merges: Vec::new(),
        };
        self.to_js(&annotations, 0, false, false, None)
    }

    /// Execute a move: 0 = Up, 1 = Down, 2 = Left, 3 = Right.
    pub fn step(&mut self, direction: u8) -> Result<JsValue, JsError> {
        let direction = Direction::from_u8(direction)?;
        let outcome = self.engine.play(direction)?;
        self.to_js(
            &outcome.annotations,
            outcome.gained,
            outcome.moved,
            outcome.reached_win,
            outcome.encoded,
        )
    }

    /// Replace the board with exponents read back from chain.
    pub fn resync(&mut self, exponents: Vec<u8>, next_move_index: u64, score: u64) -> Result<JsValue, JsError> {
        let session = self.engine.session().ok_or(InputError::NoActiveGame)?;
        let exponents: [u8; 16] = exponents.as_slice().try_into().map_err(|_| {
            JsError::new(&format!("expected 16 exponents, got {}", exponents.len()))
        })?;
        let annotations = self.engine.resync(session, &exponents, score, next_move_index)?;
        self.to_js(&annotations, 0, true, false, None)
    }

    /// [`WasmGame::resync`] from the raw return data of `getBoard`.
    #[wasm_bindgen(js_name = resyncFromReturnData)]
    pub fn resync_from_return_data(&mut self, data: Vec<u8>, score: u64) -> Result<JsValue, JsError> {
        let chain = decode_board_read(&data)?;
        self.resync(chain.exponents.to_vec(), chain.next_move_index, score)
    }

    /// Get the current board as tile values.
    #[wasm_bindgen(js_name = getBoard)]
    pub fn get_board(&self) -> Vec<u32> {
        self.engine.board().map(|b| b.values().to_vec()).unwrap_or_default()
    }

    /// Hex of the latest committed board, if a game is running.
    #[wasm_bindgen(js_name = getEncoded)]
    pub fn get_encoded(&self) -> Option<String> {
        self.engine.log().and_then(|log| log.latest()).map(to_hex)
    }

    #[wasm_bindgen(js_name = getSession)]
    pub fn get_session(&self) -> Option<String> {
        self.engine.session().map(|s| s.to_string())
    }

    #[wasm_bindgen(js_name = getScore)]
    pub fn get_score(&self) -> u64 {
        self.engine.score()
    }

    #[wasm_bindgen(js_name = isDone)]
    pub fn is_done(&self) -> bool {
        self.engine.status() == GameStatus::Over
    }

    #[wasm_bindgen(js_name = getMaxTile)]
    pub fn get_max_tile(&self) -> u32 {
        self.engine.max_tile()
    }

    /// Get legal directions as an array of 4 flags [Up, Down, Left, Right].
    #[wasm_bindgen(js_name = getLegalDirections)]
    pub fn get_legal_directions(&self) -> Vec<u8> {
        self.engine
            .legal_directions()
            .iter()
            .map(|&b| if b { 1 } else { 0 })
            .collect()
    }

    /// The four boards of the start commitment as hex strings.
    #[wasm_bindgen(js_name = startBatch)]
    pub fn start_batch(&self) -> Result<Vec<String>, JsError> {
        let log = self.engine.log().ok_or(InputError::NoActiveGame)?;
        Ok(log.start_batch()?.boards.iter().copied().map(to_hex).collect())
    }

    /// ABI calldata for `startGame`.
    #[wasm_bindgen(js_name = startGameCalldata)]
    pub fn start_game_calldata(&self) -> Result<Vec<u8>, JsError> {
        let session = self.engine.session().ok_or(InputError::NoActiveGame)?;
        let log = self.engine.log().ok_or(InputError::NoActiveGame)?;
        Ok(contract::start_game_call(session, &log.start_batch()?))
    }

    /// ABI calldata for `play` of the move recorded under `move_index`.
    #[wasm_bindgen(js_name = playCalldata)]
    pub fn play_calldata(&self, move_index: u64) -> Result<Vec<u8>, JsError> {
        let session = self.engine.session().ok_or(InputError::NoActiveGame)?;
        let log = self.engine.log().ok_or(InputError::NoActiveGame)?;
        Ok(contract::play_call(session, &log.play_commitment(move_index)?))
    }

    fn to_js(
        &self,
        annotations: &MoveAnnotations,
        gained: u64,
        moved: bool,
        reached_win: bool,
        encoded: Option<EncodedMove>,
    ) -> Result<JsValue, JsError> {
        let result = step_result(&self.engine, annotations, gained, moved, reached_win, encoded);
        Ok(serde_wasm_bindgen::to_value(&result)?)
    }
}

fn step_result(
    engine: &GameEngine,
    annotations: &MoveAnnotations,
    gained: u64,
    moved: bool,
    reached_win: bool,
    encoded: Option<EncodedMove>,
) -> JsStepResult {
    let tiles = engine
        .board()
        .map(|board| {
            board
                .tiles()
                .map(|t| JsTile {
                    id: t.id.0,
                    value: t.value,
                    row: t.position.row,
                    col: t.position.col,
                    is_new: annotations.is_new(t.id),
                    merged_from: annotations.merged_from(t.id).map(|[a, b]| [a.0, b.0]),
                })
                .collect()
        })
        .unwrap_or_default();

    JsStepResult {
        board: engine.board().map(|b| b.values().to_vec()).unwrap_or_default(),
        tiles,
        score: engine.score(),
        gained,
        moved,
        reached_win,
        status: match engine.status() {
            GameStatus::Idle => "idle",
            GameStatus::InProgress => "inProgress",
            GameStatus::Over => "over",
        },
        encoded: encoded.map(to_hex),
        next_move_index: engine.log().map_or(0, |log| log.next_index()),
    }
}

fn to_hex(encoded: EncodedMove) -> String {
    format!("{:#066x}", encoded)
}
