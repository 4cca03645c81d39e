use vfs_layers::{FsBackend, Layer, MapFS, copy_tree, is_non_unique, recommended_real};

fn main() {
    let root = std::env::temp_dir().join("vfs_layers_demo");
    println!("Output dir: {}", root.display());
    std::fs::create_dir_all(&root).unwrap();

    // confine every path to the demo dir, then create parents on demand,
    // write through `NAME.tmp` + rename and refuse writing a path twice
    let fs = recommended_real([Layer::base_dir(root.to_string_lossy())]);

    // creates `<root>/docs/en` on host, then `<root>/docs/en/hello.txt`
    fs.write_file("/docs/en/hello.txt", b"Hello", 0o644).unwrap();
    fs.write_file("/docs/en/world.txt", b"World", 0o644).unwrap();

    // the same path cannot be generated twice
    let err = fs.write_file("/docs/en/hello.txt", b"Bye", 0o644).unwrap_err();
    assert!(is_non_unique(&err));
    println!("{err}");

    // `..` cannot leave the demo dir
    assert!(fs.write_file("../outside.txt", b"", 0o644).is_err());

    // snapshot the generated tree in memory
    let snapshot = MapFS::new();
    copy_tree(&snapshot, &fs).unwrap();
    for (path, metadata) in snapshot.list() {
        println!("{path} ({} bytes, mode {:o})", metadata.len(), metadata.mode());
    }

    let hello = fs.read_file("/docs/en/hello.txt").unwrap();
    let world = fs.read_file("/docs/en/world.txt").unwrap();
    println!(
        "{}, {}!",
        String::from_utf8(hello).unwrap(),
        String::from_utf8(world).unwrap()
    );

    fs.remove_all("/docs").unwrap();
}
