//! End-to-end tests against a real listener on 127.0.0.1.
//!
//! Each test starts its own server on an ephemeral port and talks to it
//! with plain line-oriented TCP clients.

use std::net::SocketAddr;
use std::time::Duration;

use mines_core::Grid;
use mines_protocol::HELP_TEXT;
use mines_server::server::{serve, ServeOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server(grid: Grid, debug: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(serve(listener, grid, ServeOptions { debug, workers: 4 }));
    addr
}

/// Bombs at (0,0) only.
fn corner_bomb() -> Grid {
    Grid::from_rows(&[[true, false], [false, false]]).unwrap()
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr)
            .await
            .expect("Failed to connect to test server");
        let (read_half, writer) = stream.into_split();
        Client {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    /// Connect and consume the greeting.
    async fn join(addr: SocketAddr) -> Self {
        let mut client = Self::connect(addr).await;
        let greeting = client.read_line().await.expect("greeting");
        assert!(greeting.starts_with("Welcome to Minesweeper. Players: "));
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .expect("Failed to send line");
    }

    /// Next line, or `None` once the server has closed the connection.
    async fn read_line(&mut self) -> Option<String> {
        timeout(READ_TIMEOUT, self.lines.next_line())
            .await
            .expect("Timed out waiting for server")
            .unwrap_or(None)
    }

    async fn read_board(&mut self, height: usize) -> Vec<String> {
        let mut rows = Vec::with_capacity(height);
        for _ in 0..height {
            rows.push(self.read_line().await.expect("board row"));
        }
        rows
    }
}

mod session_tests {
    use super::*;

    #[tokio::test]
    async fn greeting_reports_players_and_board_size() {
        let addr = start_server(Grid::empty(7, 3).unwrap(), false).await;

        let mut first = Client::connect(addr).await;
        assert_eq!(
            first.read_line().await.as_deref(),
            Some("Welcome to Minesweeper. Players: 1 including you. Board: 7 columns by 3 rows. Type 'help' for help.")
        );

        let mut second = Client::connect(addr).await;
        assert_eq!(
            second.read_line().await.as_deref(),
            Some("Welcome to Minesweeper. Players: 2 including you. Board: 7 columns by 3 rows. Type 'help' for help.")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_connections_get_distinct_player_counts() {
        let addr = start_server(Grid::empty(2, 2).unwrap(), false).await;

        let mut a = Client::connect(addr).await;
        let mut b = Client::connect(addr).await;

        let hello_b = b.read_line().await.unwrap();
        let hello_a = a.read_line().await.unwrap();

        if hello_b.contains("Players: 1 ") {
            assert!(hello_a.contains("Players: 2 "), "{}", hello_a);
        } else {
            assert!(hello_b.contains("Players: 2 "), "{}", hello_b);
            assert!(hello_a.contains("Players: 1 "), "{}", hello_a);
        }
    }

    #[tokio::test]
    async fn bye_closes_and_frees_the_slot() {
        let addr = start_server(Grid::empty(2, 2).unwrap(), false).await;

        let mut leaving = Client::join(addr).await;
        let _staying = Client::join(addr).await;

        leaving.send("bye").await;
        assert_eq!(leaving.read_line().await, None);

        let mut newcomer = Client::connect(addr).await;
        let greeting = newcomer.read_line().await.unwrap();
        assert!(greeting.contains("Players: 2 "), "{}", greeting);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn dropped_connection_leaves_others_playing() {
        let addr = start_server(Grid::empty(2, 2).unwrap(), false).await;

        let mut staying = Client::join(addr).await;
        let vanishing = Client::join(addr).await;

        // No `bye`: the server only sees end of stream.
        drop(vanishing);

        staying.send("flag 1 1").await;
        assert_eq!(staying.read_board(2).await, vec!["- -", "- F"]);

        // Removal after EOF is asynchronous; wait until the slot is freed.
        let mut players = 0;
        for _ in 0..50 {
            let mut newcomer = Client::connect(addr).await;
            let greeting = newcomer.read_line().await.unwrap();
            if greeting.contains("Players: 2 ") {
                players = 2;
                break;
            }
            drop(newcomer);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(players, 2, "dropped session was never unregistered");

        staying.send("look").await;
        assert_eq!(staying.read_board(2).await, vec!["- -", "- F"]);
    }

    #[tokio::test]
    async fn help_and_malformed_lines_get_help_text() {
        let addr = start_server(Grid::empty(2, 2).unwrap(), false).await;
        let mut client = Client::join(addr).await;
        let help = HELP_TEXT.trim_end_matches('\n');

        for line in ["help", "dance", "dig 1", "", "look please"] {
            client.send(line).await;
            assert_eq!(client.read_line().await.as_deref(), Some(help), "line {:?}", line);
        }

        // Still connected.
        client.send("look").await;
        assert_eq!(client.read_board(2).await, vec!["- -", "- -"]);
    }

    #[tokio::test]
    async fn crlf_lines_are_accepted() {
        let addr = start_server(Grid::empty(2, 1).unwrap(), false).await;
        let mut client = Client::join(addr).await;

        client.writer.write_all(b"flag 1 0\r\n").await.unwrap();
        assert_eq!(client.read_board(1).await, vec!["- F"]);
    }
}

mod gameplay_tests {
    use super::*;

    #[tokio::test]
    async fn out_of_bounds_renders_unchanged_board() {
        let addr = start_server(corner_bomb(), false).await;
        let mut client = Client::join(addr).await;

        for line in ["dig 2 0", "dig -1 -1", "flag 0 2", "deflag 9 9"] {
            client.send(line).await;
            assert_eq!(client.read_board(2).await, vec!["- -", "- -"], "line {:?}", line);
        }
    }

    #[tokio::test]
    async fn boom_disconnects_outside_debug_mode() {
        let addr = start_server(corner_bomb(), false).await;
        let mut client = Client::join(addr).await;

        client.send("dig 0 0").await;
        assert_eq!(client.read_line().await.as_deref(), Some("BOOM!"));
        assert_eq!(client.read_line().await, None);

        // The bomb is gone for everyone else.
        let mut other = Client::join(addr).await;
        other.send("look").await;
        assert_eq!(other.read_board(2).await, vec!["   ", "   "]);
    }

    #[tokio::test]
    async fn boom_keeps_connection_in_debug_mode() {
        let addr = start_server(corner_bomb(), true).await;
        let mut client = Client::join(addr).await;

        client.send("dig 0 0").await;
        assert_eq!(client.read_line().await.as_deref(), Some("BOOM!"));

        client.send("look").await;
        assert_eq!(client.read_board(2).await, vec!["   ", "   "]);
    }

    #[tokio::test]
    async fn players_share_one_board() {
        let addr = start_server(corner_bomb(), false).await;
        let mut digger = Client::join(addr).await;
        let mut watcher = Client::join(addr).await;

        digger.send("dig 1 1").await;
        assert_eq!(digger.read_board(2).await, vec!["- -", "- 1"]);

        watcher.send("flag 0 0").await;
        assert_eq!(watcher.read_board(2).await, vec!["F -", "- 1"]);

        digger.send("look").await;
        assert_eq!(digger.read_board(2).await, vec!["F -", "- 1"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pipelined_commands_apply_in_order() {
        let addr = start_server(Grid::empty(3, 1).unwrap(), false).await;
        let mut client = Client::join(addr).await;

        // One write, many lines: replies must follow line order.
        client
            .writer
            .write_all(b"flag 0 0\ndeflag 0 0\nflag 0 0\nflag 2 0\ndeflag 0 0\nlook\n")
            .await
            .unwrap();

        let expected = ["F - -", "- - -", "F - -", "F - F", "- - F", "- - F"];
        for want in expected {
            assert_eq!(client.read_board(1).await, vec![want]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_clients_mutate_concurrently() {
        const PLAYERS: usize = 8;
        let addr = start_server(Grid::empty(PLAYERS, 2).unwrap(), false).await;

        let handles: Vec<_> = (0..PLAYERS)
            .map(|x| {
                tokio::spawn(async move {
                    let mut client = Client::join(addr).await;
                    client.send(&format!("flag {} 0", x)).await;
                    let board = client.read_board(2).await;
                    assert_eq!(board[0].split(' ').nth(x), Some("F"));
                    client.send("bye").await;
                    assert_eq!(client.read_line().await, None);
                })
            })
            .collect();

        for handle in handles {
            handle.await.expect("client task panicked");
        }

        let mut observer = Client::join(addr).await;
        observer.send("look").await;
        let board = observer.read_board(2).await;
        assert_eq!(board[0], vec!["F"; PLAYERS].join(" "));
        assert_eq!(board[1], vec!["-"; PLAYERS].join(" "));
    }
}
