use slither_core::{
    Board, Error, QAgent, SavedModel, StorageError, TrainConfig, Trainer, load_model,
    play_episode, save_model, train,
};

fn quick_config(seed: u64) -> TrainConfig {
    TrainConfig {
        grid_size: 8,
        episodes: 60,
        max_steps: 300,
        eval_runs: 2,
        seed: Some(seed),
        ..TrainConfig::default()
    }
}

#[test]
fn trained_model_survives_a_round_trip() {
    let config = quick_config(21);
    let (table, summary) = train(&config).unwrap();
    assert_eq!(summary.episodes, 60);
    assert_eq!(summary.evaluation_lengths.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models").join("snake.json");
    let model = SavedModel::from_training(&config, &summary, table.clone());
    save_model(&model, &path).unwrap();

    let loaded = load_model(&path).unwrap();
    assert_eq!(loaded.table, table);
    assert_eq!(loaded.metadata.grid_size, 8);
    assert_eq!(loaded.metadata.episodes_trained, 60);
    assert_eq!(loaded.metadata.best_length, summary.best_length);

    let mut board = Board::seeded(loaded.metadata.grid_size, 3).unwrap();
    let mut agent = QAgent::greedy(loaded.table, 3);
    let report = play_episode(&mut board, &mut agent, config.max_steps, false);
    assert!(report.steps <= config.max_steps);
    assert!(report.length >= 1);
}

#[test]
fn training_can_resume_from_a_saved_table() {
    let config = quick_config(4);
    let (table, _) = train(&config).unwrap();
    let states_before = table.len();

    let mut trainer = Trainer::with_table(config, table).unwrap();
    trainer.train().unwrap();
    assert!(trainer.agent().table().len() >= states_before);
}

#[test]
fn load_errors_are_storage_errors() {
    let dir = tempfile::tempdir().unwrap();
    let err: Error = load_model(&dir.path().join("nope.json")).unwrap_err().into();
    assert!(matches!(err, Error::Storage(StorageError::Io { .. })));
}
