//! The game state machine.
//!
//! `GameEngine` owns the current board, the move log of the running session
//! and the spawn strategy. It is the only place that advances a game: every
//! successful move produces a new [`Board`], spawns one tile and appends one
//! encoded entry to the log.

use tracing::{debug, info, trace};

use crate::board::{Board, Direction, Tile, TileId, TileIds, CELLS};
use crate::codec::{self, EncodedMove};
use crate::config::EngineConfig;
use crate::contract::ChainStateReader;
use crate::error::{GameError, InputError, SyncError};
use crate::move_log::MoveLog;
use crate::rules::{self, MoveAnnotations};
use crate::session::SessionId;
use crate::spawn::{spawner_from_config, SpawnContext, TileSpawner};

/// Where the engine is in a game's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    /// No game has been started.
    Idle,
    /// The board has an empty cell or a legal merge.
    InProgress,
    /// The board is full and no two neighbours are equal.
    Over,
}

/// Result of [`GameEngine::play`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Whether the board changed (and a new tile was spawned).
    pub moved: bool,
    /// Points earned from merges in this move.
    pub gained: u64,
    /// True on the first move that produces a tile of at least the win value.
    pub reached_win: bool,
    pub status: GameStatus,
    pub annotations: MoveAnnotations,
    /// The appended log entry, when the board changed.
    pub encoded: Option<EncodedMove>,
}

/// Everything needed to roll the engine back to an earlier point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub session: SessionId,
    pub board: Board,
    pub log: MoveLog,
    pub won: bool,
}

pub struct GameEngine {
    config: EngineConfig,
    spawner: Box<dyn TileSpawner>,
    ids: TileIds,
    game: Option<Snapshot>,
}

impl GameEngine {
    /// An idle engine using the spawn strategy from `config`.
    pub fn new(config: EngineConfig) -> Self {
        let spawner = spawner_from_config(&config.spawn);
        Self::with_spawner(config, spawner)
    }

    /// An idle engine with an explicit spawner (ignores `config.spawn`).
    pub fn with_spawner(config: EngineConfig, spawner: Box<dyn TileSpawner>) -> Self {
        GameEngine {
            config,
            spawner,
            ids: TileIds::new(),
            game: None,
        }
    }

    /// Start a new game: empty board, two spawned tiles, score 0, and a move
    /// log holding only the pregame board.
    pub fn initialize(&mut self, session: SessionId) -> Result<&Board, GameError> {
        let mut board = Board::empty();
        for ordinal in 0..2 {
            let ctx = SpawnContext {
                session,
                move_index: 0,
                ordinal,
            };
            spawn_tile(self.spawner.as_mut(), &mut self.ids, &mut board, ctx);
        }
        let initial = codec::encode(&board, Direction::Up)?;

        info!(%session, deterministic = self.spawner.is_deterministic(), "game initialized");
        let game = self.game.insert(Snapshot {
            session,
            board,
            log: MoveLog::new(initial),
            won: false,
        });
        Ok(&game.board)
    }

    /// Apply one move.
    ///
    /// A move that changes nothing returns `moved == false` and leaves board,
    /// score and log untouched; this includes a finished game. Only calling
    /// before [`GameEngine::initialize`] is an error.
    pub fn play(&mut self, direction: Direction) -> Result<MoveOutcome, GameError> {
        let win_tile = self.config.win_tile;
        let game = self.game.as_mut().ok_or(InputError::NoActiveGame)?;

        let mut ids = self.ids.clone();
        let slide = rules::slide(&game.board, direction, &mut ids);
        if !slide.moved {
            debug!(?direction, "move changed nothing");
            return Ok(MoveOutcome {
                moved: false,
                gained: 0,
                reached_win: false,
                status: status_of(&game.board),
                annotations: MoveAnnotations::default(),
                encoded: None,
            });
        }

        // Nothing may advance (spawner, id counter) on a board that cannot
        // be committed.
        codec::encode(&slide.board, direction)?;

        let mut next = slide.board;
        let move_index = game.log.next_index();
        let ctx = SpawnContext {
            session: game.session,
            move_index,
            ordinal: 0,
        };
        let spawned = spawn_tile(self.spawner.as_mut(), &mut ids, &mut next, ctx);
        let encoded = codec::encode(&next, direction)?;
        self.ids = ids;

        let reached_win = !game.won && next.max_tile() >= win_tile;
        game.won |= reached_win;
        game.log.append(encoded);
        game.board = next;

        let status = status_of(&game.board);
        debug!(?direction, move_index, gained = slide.gained, score = game.board.score(), "move applied");
        if reached_win {
            info!(move_index, win_tile, "win tile reached");
        }
        if status == GameStatus::Over {
            info!(move_index, score = game.board.score(), "game over");
        }

        Ok(MoveOutcome {
            moved: true,
            gained: slide.gained,
            reached_win,
            status,
            annotations: MoveAnnotations {
                spawned: spawned.into_iter().collect(),
                merges: slide.merges,
            },
            encoded: Some(encoded),
        })
    }

    /// Replace the current board without replaying history.
    ///
    /// `next_move_index` is the index the next move will be committed under;
    /// the log restarts at `next_move_index - 1` holding `board`.
    pub fn reseed(&mut self, session: SessionId, board: Board, next_move_index: u64) -> Result<&Board, GameError> {
        if next_move_index == 0 {
            return Err(InputError::InvalidMoveIndex(next_move_index).into());
        }
        let current = codec::encode(&board, Direction::Up)?;
        let won = board.max_tile() >= self.config.win_tile;

        info!(%session, next_move_index, "engine reseeded");
        let game = self.game.insert(Snapshot {
            session,
            board,
            log: MoveLog::resume(next_move_index - 1, current),
            won,
        });
        Ok(&game.board)
    }

    /// Rebuild the board from per-cell exponents read back from the chain.
    ///
    /// Every rebuilt tile is reported as new. The score is not stored on chain
    /// and restarts at `score`.
    pub fn resync(
        &mut self,
        session: SessionId,
        exponents: &[u8; CELLS],
        score: u64,
        next_move_index: u64,
    ) -> Result<MoveAnnotations, GameError> {
        let mut ids = self.ids.clone();
        let board = Board::from_exponents(exponents, score, &mut ids)?;
        let board = self.reseed(session, board, next_move_index)?;
        let spawned = board.tiles().map(|t| t.id).collect();
        self.ids = ids;
        Ok(MoveAnnotations {
            spawned,
            merges: Vec::new(),
        })
    }

    /// [`GameEngine::resync`] from whatever the chain reader reports.
    pub fn resync_from<R: ChainStateReader>(
        &mut self,
        reader: &R,
        session: SessionId,
        score: u64,
    ) -> Result<MoveAnnotations, SyncError<R::Error>> {
        let chain = reader.latest_board(session).map_err(SyncError::Read)?;
        Ok(self.resync(session, &chain.exponents, score, chain.next_move_index)?)
    }

    /// A copy of the running game for a later [`GameEngine::restore`].
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.game.clone()
    }

    /// Put back a snapshot taken earlier, log included.
    pub fn restore(&mut self, snapshot: Snapshot) {
        info!(session = %snapshot.session, next_move_index = snapshot.log.next_index(), "engine restored");
        self.game = Some(snapshot);
    }

    /// Drop the running game.
    pub fn abandon(&mut self) {
        self.game = None;
    }

    pub fn status(&self) -> GameStatus {
        self.game
            .as_ref()
            .map_or(GameStatus::Idle, |g| status_of(&g.board))
    }

    pub fn board(&self) -> Option<&Board> {
        self.game.as_ref().map(|g| &g.board)
    }

    pub fn session(&self) -> Option<SessionId> {
        self.game.as_ref().map(|g| g.session)
    }

    pub fn log(&self) -> Option<&MoveLog> {
        self.game.as_ref().map(|g| &g.log)
    }

    pub fn score(&self) -> u64 {
        self.board().map_or(0, Board::score)
    }

    pub fn max_tile(&self) -> u32 {
        self.board().map_or(0, Board::max_tile)
    }

    pub fn has_won(&self) -> bool {
        self.game.as_ref().is_some_and(|g| g.won)
    }

    /// Legal directions as [Up, Down, Left, Right]; all false when idle.
    pub fn legal_directions(&self) -> [bool; 4] {
        self.board()
            .map_or([false; 4], rules::legal_directions)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn status_of(board: &Board) -> GameStatus {
    if rules::is_over(board) {
        GameStatus::Over
    } else {
        GameStatus::InProgress
    }
}

/// Place one tile chosen by `spawner`; `None` when the board is full.
fn spawn_tile(
    spawner: &mut dyn TileSpawner,
    ids: &mut TileIds,
    board: &mut Board,
    ctx: SpawnContext,
) -> Option<TileId> {
    let (position, value) = spawner.pick(&board.empty_positions(), ctx)?;
    let id = ids.fresh();
    board.place(Tile { id, value, position });
    trace!(move_index = ctx.move_index, ordinal = ctx.ordinal, row = position.row, col = position.col, value, "tile spawned");
    Some(id)
}
