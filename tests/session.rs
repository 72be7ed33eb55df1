//! Session registry shared by concurrent expansions.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alembic_procedural::prelude::*;
use alembic_procedural::session::shape_key;

#[test]
fn test_concurrent_names_are_unique() {
    let session = RenderSession::new();
    let names: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| (0..50).map(|_| session.unique_name("shape")).collect::<Vec<_>>()))
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), 400);
    assert!(unique.contains(&"shape".to_string()));
}

#[test]
fn test_concurrent_archive_open_once() {
    let session = RenderSession::new();
    let opens = AtomicUsize::new(0);
    let path = Path::new("/shots/010/cache.abc");

    let graphs: Vec<Arc<SceneGraph>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    session
                        .acquire_archive(path, |p| {
                            opens.fetch_add(1, Ordering::SeqCst);
                            Ok(SceneGraph::new(p.display().to_string()))
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(opens.load(Ordering::SeqCst), 1);
    assert!(graphs.iter().all(|g| Arc::ptr_eq(g, &graphs[0])));
    assert_eq!(session.archive_refs(path), 8);

    let closed = (0..8).filter(|_| session.release_archive(path)).count();
    assert_eq!(closed, 1);
    assert_eq!(session.archive_refs(path), 0);
}

#[test]
fn test_master_registered_once_across_threads() {
    let session = RenderSession::new();
    let key = shape_key(Path::new("/a.abc"), "/geo/tree", 1.0);
    let winners: HashSet<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let session = &session;
                let key = &key;
                s.spawn(move || session.register_master(key, &format!("tree_{i}")))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(winners.len(), 1);
    assert_eq!(session.master_node(&key), winners.into_iter().next());
}

#[test]
fn test_instances_share_master_within_frame() {
    let mut memo = FrameMemo::new(1.0);
    let session = RenderSession::new();
    let mut emitted = Vec::new();
    for path in ["/geo/tree", "/geo/tree", "/geo/rock"] {
        let name = match memo.processed(path) {
            Some(name) => name.to_owned(),
            None => {
                let name = session.unique_name(path.trim_start_matches('/'));
                memo.mark(path, &name);
                name
            }
        };
        emitted.push(name);
    }
    assert_eq!(emitted, vec!["geo/tree", "geo/tree", "geo/rock"]);
}
