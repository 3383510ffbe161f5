use std::path::PathBuf;

#[test]
fn cli_plan_writes_a_recipe() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let song_path = dir.join("song.json");
    let out_path = dir.join("recipe.json");
    let _ = std::fs::remove_file(&out_path);

    std::fs::write(
        &song_path,
        r#"{
            "id": "1767801950583",
            "tracks": [
                {"partId": "11", "offset": 1500},
                {"partId": "22"}
            ]
        }"#,
    )
    .unwrap();

    let exe = std::env::var_os("CARGO_BIN_EXE_chorale")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("target").join("debug").join("chorale"));

    let status = std::process::Command::new(&exe)
        .args([
            "plan",
            "--song",
            song_path.to_str().unwrap(),
            "--out",
            out_path.to_str().unwrap(),
            "--width",
            "1280",
            "--height",
            "960",
            "--margin",
            "0",
            "--no-center",
        ])
        .status()
        .unwrap();
    assert!(status.success());

    let recipe: chorale::Recipe =
        serde_json::from_reader(std::fs::File::open(&out_path).unwrap()).unwrap();
    assert_eq!(recipe.song_id, "1767801950583");
    assert_eq!(recipe.output.size, [1280, 960]);
    assert_eq!(recipe.inputs.len(), 2);

    // Two default-sized tiles share the top shelf: pans are the pinned
    // -0.5 / 0.5 pair from the layout contract.
    let mut pans: Vec<f64> = recipe.inputs.iter().map(|i| i.pan.unwrap()).collect();
    pans.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert!((pans[0] + 0.5).abs() < 1e-12);
    assert!((pans[1] - 0.5).abs() < 1e-12);

    assert_eq!(recipe.runbook.rows, vec![0]);
    assert_eq!(recipe.runbook.slice(0).len(), 2);
    assert_eq!(recipe.runbook.rows_hash.len(), 8);

    // The offset survives into the positioned input, in milliseconds.
    let first = recipe
        .inputs
        .iter()
        .find(|i| i.part_id == "11")
        .unwrap();
    assert_eq!(first.offset, 1500.0);
}
