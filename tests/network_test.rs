use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use homerun::generator::{ScatterGenerator, WorldGenerator, WorldLayout};
use homerun::network::{ChannelPresenter, EVENT_BUFFER, EventServer, WorldView, decode_event};
use homerun::{Direction, Grid, SimulationEvent, Station};

fn world() -> Grid {
    Grid::parse(
        "M...#.
         ..#...
         .#H..M
         ...#..
         M.....
         ..#..M",
    )
    .unwrap()
}

/// Reads events until the run is reported finished, folding them into a view.
async fn watch(stream: TcpStream) -> WorldView {
    let mut lines = BufReader::new(stream).lines();
    let mut view = WorldView::new();
    while let Some(line) = lines.next_line().await.expect("readable stream") {
        let event = decode_event(&line).expect("well-formed event");
        view.apply(&event);
        if matches!(event, SimulationEvent::RunFinished { .. }) {
            break;
        }
    }
    view
}

#[tokio::test]
async fn viewer_sees_the_whole_run() {
    let server = EventServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(server.run(event_rx, async {
        let _ = stop_rx.await;
    }));

    let viewer = tokio::spawn(watch(TcpStream::connect(addr).await.unwrap()));
    // give the server a moment to register the viewer before events flow
    tokio::time::sleep(Duration::from_millis(50)).await;

    let simulation = tokio::task::spawn_blocking(move || {
        let mut station = Station::new(world(), Direction::East);
        let report = station.run(&mut ChannelPresenter::new(event_tx)).unwrap();
        (station.grid().clone(), report)
    });
    let (grid, report) = simulation.await.unwrap();

    let view = tokio::time::timeout(Duration::from_secs(5), viewer)
        .await
        .expect("viewer finished in time")
        .unwrap();
    assert_eq!(view.cells, grid.cells());
    assert_eq!(view.finished, Some((report.collected.len(), report.unreachable)));
    assert_eq!(report.collected.len(), 4);

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn late_viewer_gets_the_final_snapshot() {
    let server = EventServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(server.run(event_rx, async {
        let _ = stop_rx.await;
    }));

    let (grid, report) = tokio::task::spawn_blocking(move || {
        let mut station = Station::new(world(), Direction::West);
        let report = station.run(&mut ChannelPresenter::new(event_tx)).unwrap();
        (station.grid().clone(), report)
    })
    .await
    .unwrap();

    // the simulation is over and the channel closed; the server keeps
    // answering new viewers with the final world
    tokio::time::sleep(Duration::from_millis(50)).await;
    let view = tokio::time::timeout(
        Duration::from_secs(5),
        watch(TcpStream::connect(addr).await.unwrap()),
    )
    .await
    .expect("snapshot delivered");

    assert_eq!(view.cells, grid.cells());
    assert_eq!(view.home, grid.home());
    assert_eq!(view.finished, Some((report.collected.len(), 0)));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn viewer_that_never_reads_cannot_stall_the_server() {
    let server = EventServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(server.run(event_rx, async {
        let _ = stop_rx.await;
    }));

    // connected but never read: its socket buffers fill up early in the run
    let stalled = TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // a long run, several megabytes of events
    let grid = ScatterGenerator::new(Some(4))
        .generate(&WorldLayout {
            size: 60,
            home: (30, 30),
            marker_count: 1000,
            obstacle_count: 500,
        })
        .unwrap();
    let simulation = tokio::task::spawn_blocking(move || {
        let mut station = Station::new(grid, Direction::North);
        station.run(&mut ChannelPresenter::new(event_tx)).unwrap()
    });
    let report = tokio::time::timeout(Duration::from_secs(60), simulation)
        .await
        .expect("simulation kept flowing")
        .unwrap();

    // the server still answers new viewers
    tokio::time::sleep(Duration::from_millis(50)).await;
    let view = tokio::time::timeout(
        Duration::from_secs(5),
        watch(TcpStream::connect(addr).await.unwrap()),
    )
    .await
    .expect("snapshot delivered");
    assert_eq!(view.finished, Some((report.collected.len(), report.unreachable)));

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stopped on shutdown")
        .unwrap()
        .unwrap();
    drop(stalled);
}
