//! ツリー全体での動作確認

use std::fs;
use std::io;
use std::path::Path;

use clap::Parser;
use linksame::app::execute;
use linksame::cli::Args;
use linksame::config::Config;
use linksame::linker::{is_same_inode, FileSystem, LinkOptions, LinkStats, Linker, RealFileSystem};
use linksame::matcher::resolve_all;
use linksame::scanner::scan_tree;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn run_with(root: &Path, flags: &[&str]) -> LinkStats {
    let mut argv = vec!["linksame", "-qq"];
    argv.extend_from_slice(flags);
    let root = root.to_str().unwrap();
    argv.push(root);
    let config = Config::from_args(&Args::parse_from(argv)).unwrap();
    execute(&config).unwrap()
}

fn is_regular(path: &Path) -> bool {
    fs::symlink_metadata(path).unwrap().file_type().is_file()
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).unwrap().file_type().is_symlink()
}

#[test]
fn test_hello_world_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "a.txt", b"hello");
    write(root, "b.txt", b"world");
    write(root, "dir/c.txt", b"hello");

    let stats = run_with(root, &["-w"]);

    assert_eq!(stats.links, 1);
    assert_eq!(stats.bytes_saved, 5);
    // dir/c.txt のパスが長いので残り、a.txt がリンクになる
    assert!(is_same_inode(&root.join("a.txt"), &root.join("dir/c.txt")).unwrap());
    assert!(!is_same_inode(&root.join("b.txt"), &root.join("dir/c.txt")).unwrap());
    assert_eq!(fs::read(root.join("b.txt")).unwrap(), b"world");
}

#[test]
fn test_shared_library_scenario_with_symlinks() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for name in ["libexample.so.1.0", "libexample.so.1", "libexample.so"] {
        write(root, name, b"\x7fELF shared object");
    }

    let stats = run_with(root, &["-w", "-s"]);

    assert_eq!(stats.links, 2);
    assert!(is_regular(&root.join("libexample.so.1.0")));
    for name in ["libexample.so.1", "libexample.so"] {
        let link = root.join(name);
        assert!(is_symlink(&link));
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("libexample.so.1.0"));
    }
}

#[test]
fn test_identical_pair_leaves_one_regular_file() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "x/first.dat", b"identical bytes");
    write(root, "y/second.dat", b"identical bytes");

    run_with(root, &["-w", "-s"]);

    let first = root.join("x/first.dat");
    let second = root.join("y/second.dat");
    let regular = [is_regular(&first), is_regular(&second)];
    assert_eq!(regular.iter().filter(|r| **r).count(), 1);
    assert_eq!(fs::read(&first).unwrap(), b"identical bytes");
    assert_eq!(fs::read(&second).unwrap(), b"identical bytes");
}

#[test]
fn test_second_run_is_a_no_op() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "one", b"content");
    write(root, "two", b"content");
    write(root, "sub/three", b"content");

    let first = run_with(root, &["-w"]);
    assert_eq!(first.links, 2);

    let second = run_with(root, &["-w"]);
    assert_eq!(second.links, 0);
    assert_eq!(second.bytes_saved, 0);
    assert_eq!(second.already_linked, 2);
}

#[test]
fn test_dry_run_matches_real_run() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "a", b"aaaa");
    write(root, "aa", b"aaaa");
    write(root, "dir/aaa", b"aaaa");
    write(root, "b", b"bbbbbbbb");
    write(root, "bb", b"bbbbbbbb");
    write(root, "unique", b"u");

    let dry = run_with(root, &[]);
    assert!(!is_same_inode(&root.join("a"), &root.join("aa")).unwrap());

    let real = run_with(root, &["-w"]);

    assert_eq!(dry.links, real.links);
    assert_eq!(dry.bytes_saved, real.bytes_saved);
    assert_eq!(real.links, 3);
    assert_eq!(real.bytes_saved, 4 + 4 + 8);
}

#[test]
fn test_empty_files_are_never_linked() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for name in ["e1", "e2", "e3", "sub/e4"] {
        write(root, name, b"");
    }

    let stats = run_with(root, &["-w"]);

    assert_eq!(stats.links, 0);
    assert!(!is_same_inode(&root.join("e1"), &root.join("e2")).unwrap());
}

#[test]
fn test_pattern_limits_candidates() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "keep.txt", b"same");
    write(root, "keep2.txt", b"same");
    write(root, "other.bin", b"same");

    let stats = run_with(root, &["-w", "-p", "*.txt"]);

    assert_eq!(stats.links, 1);
    assert!(is_same_inode(&root.join("keep.txt"), &root.join("keep2.txt")).unwrap());
    assert!(!is_same_inode(&root.join("other.bin"), &root.join("keep2.txt")).unwrap());
}

#[test]
fn test_update_mode_links_external_file() {
    let temp_dir = TempDir::new().unwrap();
    let tree = temp_dir.path().join("tree");
    write(&tree, "copy_one", b"dup");
    write(&tree, "nested/copy_two", b"dup");
    write(&tree, "different", b"abc");
    let external = temp_dir.path().join("X");
    fs::write(&external, b"dup").unwrap();

    let stats = run_with(&tree, &["-w", "-u", external.to_str().unwrap()]);

    // X を含む3ファイルのうち2つがリンクになる
    assert_eq!(stats.links, 2);
    assert_eq!(stats.bytes_saved, 6);
    // nested/copy_two はファイル名が最長なので残る
    let survivor = tree.join("nested/copy_two");
    assert!(is_same_inode(&external, &survivor).unwrap());
    assert!(is_same_inode(&tree.join("copy_one"), &survivor).unwrap());
    assert!(!is_same_inode(&tree.join("different"), &survivor).unwrap());
}

/// ハードリンクを常に失敗させる (別デバイス相当)
struct CrossDevice;

impl FileSystem for CrossDevice {
    fn same_file(&self, a: &Path, b: &Path) -> io::Result<bool> {
        RealFileSystem.same_file(a, b)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        RealFileSystem.remove_file(path)
    }

    fn hard_link(&self, _original: &Path, _link: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "Invalid cross-device link"))
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        RealFileSystem.symlink(target, link)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        RealFileSystem.copy(from, to)
    }
}

#[cfg(unix)]
#[test]
fn test_hardlink_failure_falls_back_to_relative_symlink_that_survives_move() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("before");
    write(&root, "a/short", b"payload");
    write(&root, "b/c/the_longer_name", b"payload");

    let buckets = scan_tree(&root, None).unwrap();
    let (sets, _) = resolve_all(buckets.into_candidates()).unwrap();
    assert_eq!(sets.len(), 1);

    let options = LinkOptions {
        write: true,
        ..LinkOptions::default()
    };
    let linker = Linker::with_fs(CrossDevice, options);
    let mut stats = LinkStats::default();
    for set in sets {
        stats.merge(&linker.link_set(set, |_, _, _| {}));
    }
    assert_eq!(stats.links, 1);

    let link = root.join("a/short");
    assert!(is_symlink(&link));
    assert_eq!(fs::read_link(&link).unwrap(), Path::new("../b/c/the_longer_name"));

    // ツリーごと移動してもリンクが解決できる
    let moved = temp_dir.path().join("after");
    fs::rename(&root, &moved).unwrap();
    assert_eq!(fs::read(moved.join("a/short")).unwrap(), b"payload");
}

#[test]
fn test_invalid_root_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing");
    let argv = vec!["linksame", "-qq", missing.to_str().unwrap()];
    let config = Config::from_args(&Args::parse_from(argv)).unwrap();

    assert!(execute(&config).is_err());
}
