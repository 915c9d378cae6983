mod common;

use serde_json::json;

use common::{settings, Harness};
use streamkit_engine::{
    construct_encoder, construct_output, construct_provider, PipelineError, Registries,
    AUDIO_ENCODERS_STORE, OUTPUTS_STORE, PROVIDERS_STORE, VIDEO_ENCODERS_STORE,
};
use streamkit_ipc::{EncoderEvent, EncoderKind, OutputEvent, Provider, Settings};
use streamkit_media::{EngineError, HandleKind, MediaEngine};

fn registries(harness: &Harness) -> Registries {
    let mut registries = Registries::new(&harness.context()).unwrap();
    registries.init().unwrap();
    registries
}

#[test]
fn test_encoder_presence_follows_add_and_remove() {
    let harness = Harness::new();
    let mut registries = registries(&harness);

    let audio = construct_encoder(
        harness.engine.as_ref(),
        EncoderKind::Audio,
        "mf_aac",
        "encoder_1",
        settings(json!({ "bitrate": 160 })),
    )
    .unwrap();
    let video = construct_encoder(
        harness.engine.as_ref(),
        EncoderKind::Video,
        "obs_x264",
        "encoder_2",
        Settings::new(),
    )
    .unwrap();
    registries.encoders.add_audio_encoder(audio).unwrap();
    registries.encoders.add_video_encoder(video).unwrap();

    assert!(registries.encoders.is_audio_encoder("encoder_1"));
    assert!(registries.encoders.is_video_encoder("encoder_2"));
    assert!(!registries.encoders.is_video_encoder("encoder_1"));
    assert_eq!(
        harness.document(AUDIO_ENCODERS_STORE),
        json!({ "encoder_1": { "type": "mf_aac", "settings": { "bitrate": 160 } } })
    );

    registries.encoders.remove_audio_encoder("encoder_1").unwrap();
    registries.encoders.remove_video_encoder("encoder_2").unwrap();

    assert!(!registries.encoders.is_audio_encoder("encoder_1"));
    assert!(!registries.encoders.is_video_encoder("encoder_2"));
    assert!(registries.encoders.state().audio.is_empty());
    assert_eq!(harness.document(AUDIO_ENCODERS_STORE), json!({}));
    assert_eq!(harness.document(VIDEO_ENCODERS_STORE), json!({}));
    assert_eq!(harness.engine.object_count(), 0);
}

#[test]
fn test_add_checks_encoder_kind() {
    let harness = Harness::new();
    let mut registries = registries(&harness);

    let video = construct_encoder(
        harness.engine.as_ref(),
        EncoderKind::Video,
        "obs_x264",
        "encoder_1",
        Settings::new(),
    )
    .unwrap();

    let err = registries.encoders.add_audio_encoder(video).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Engine(EngineError::WrongKind {
            expected: HandleKind::AudioEncoder,
            actual: HandleKind::VideoEncoder,
        })
    ));
    assert!(registries.encoders.state().audio.is_empty());
    assert_eq!(harness.document(AUDIO_ENCODERS_STORE), json!({}));
}

#[test]
fn test_provider_and_output_presence_follow_add_and_remove() {
    let harness = Harness::new();
    let mut registries = registries(&harness);
    let engine = harness.engine.as_ref();

    let provider = construct_provider(engine, "rtmp_custom", "provider_1", Settings::new()).unwrap();
    registries.providers.add(provider).unwrap();
    let output = construct_output(engine, "rtmp_output", "output_1", Settings::new()).unwrap();
    registries.outputs.add(output).unwrap();

    assert!(registries.providers.is_provider("provider_1"));
    assert!(registries.outputs.is_output("output_1"));

    registries.outputs.remove("output_1").unwrap();
    registries.providers.remove("provider_1").unwrap();

    assert!(!registries.providers.is_provider("provider_1"));
    assert!(!registries.outputs.is_output("output_1"));
    assert_eq!(harness.document(OUTPUTS_STORE), json!({}));
    assert_eq!(harness.document(PROVIDERS_STORE), json!({}));
}

#[test]
fn test_remove_of_unknown_id_fails_and_changes_nothing() {
    let harness = Harness::new();
    let mut registries = registries(&harness);

    let audio = construct_encoder(
        harness.engine.as_ref(),
        EncoderKind::Audio,
        "mf_aac",
        "encoder_1",
        Settings::new(),
    )
    .unwrap();
    registries.encoders.add(audio).unwrap();

    let err = registries
        .encoders
        .remove_video_encoder("encoder_1")
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Engine(EngineError::HandleNotFound {
            kind: HandleKind::VideoEncoder,
            ..
        })
    ));

    let err = registries.outputs.remove("output_7").unwrap_err();
    assert!(matches!(err, PipelineError::Engine(EngineError::HandleNotFound { .. })));

    assert!(registries.encoders.is_audio_encoder("encoder_1"));
    assert!(registries.encoders.audio_encoder("encoder_1").is_some());
    assert!(harness.document(AUDIO_ENCODERS_STORE).get("encoder_1").is_some());
}

#[test]
fn test_restart_restores_type_and_settings() {
    let mut harness = Harness::new();
    {
        let mut registries = registries(&harness);
        let engine = harness.engine.as_ref();

        let video = construct_encoder(
            engine,
            EncoderKind::Video,
            "ffmpeg_nvenc",
            "encoder_4",
            settings(json!({ "rate_control": "CBR", "bitrate": 6000 })),
        )
        .unwrap();
        registries.encoders.add(video).unwrap();

        let provider = construct_provider(
            engine,
            "rtmp_custom",
            "provider_2",
            settings(json!({ "server": "rtmp://example.test/live" })),
        )
        .unwrap();
        registries
            .providers
            .add(Provider {
                key: Some("secret".into()),
                provider_name: Some("Custom".into()),
                ..provider
            })
            .unwrap();
    }

    harness.restart();
    let registries = registries(&harness);

    let video = registries.encoders.video_encoder("encoder_4").unwrap();
    assert_eq!(video.type_id, "ffmpeg_nvenc");
    assert_eq!(video.settings, settings(json!({ "rate_control": "CBR", "bitrate": 6000 })));
    assert!(registries.encoders.is_video_encoder("encoder_4"));
    assert_eq!(
        harness.engine.describe(HandleKind::VideoEncoder, "encoder_4"),
        Some((video.type_id.clone(), video.settings.clone()))
    );

    let provider = registries.providers.provider("provider_2").unwrap();
    assert_eq!(provider.type_id, "rtmp_custom");
    assert_eq!(provider.key.as_deref(), Some("secret"));
    assert_eq!(provider.provider_name.as_deref(), Some("Custom"));
    assert!(registries.providers.is_provider("provider_2"));
}

#[test]
fn test_restart_rebinds_output_references() {
    let mut harness = Harness::new();
    {
        let mut registries = registries(&harness);
        let engine = harness.engine.as_ref();

        for (kind, type_id, id) in [
            (EncoderKind::Audio, "mf_aac", "encoder_1"),
            (EncoderKind::Video, "obs_x264", "encoder_2"),
        ] {
            let encoder = construct_encoder(engine, kind, type_id, id, Settings::new()).unwrap();
            registries.encoders.add(encoder).unwrap();
        }
        let provider = construct_provider(engine, "rtmp_common", "provider_1", Settings::new()).unwrap();
        registries.providers.add(provider).unwrap();
        let output = construct_output(engine, "rtmp_output", "output_1", Settings::new()).unwrap();
        registries.outputs.add(output).unwrap();

        registries
            .outputs
            .set_output_encoders("output_1", "encoder_1", "encoder_2")
            .unwrap();
        registries
            .outputs
            .set_output_service("output_1", "provider_1")
            .unwrap();
        registries.outputs.start("output_1").unwrap();
    }

    harness.restart();
    let registries = registries(&harness);

    let output = registries.outputs.output("output_1").unwrap();
    assert_eq!(output.audio_encoder_id.as_deref(), Some("encoder_1"));
    assert_eq!(output.video_encoder_id.as_deref(), Some("encoder_2"));
    assert_eq!(output.provider_id.as_deref(), Some("provider_1"));
    assert!(!registries.outputs.is_output_active("output_1"));

    let bindings = harness.engine.output_bindings("output_1").unwrap();
    assert_eq!(bindings.audio_tracks.get(&0).map(String::as_str), Some("encoder_1"));
    assert_eq!(bindings.video_encoder.as_deref(), Some("encoder_2"));
    assert_eq!(bindings.service.as_deref(), Some("provider_1"));
    assert!(!bindings.active);
}

#[test]
fn test_dangling_video_reference_is_left_unset() {
    let harness = Harness::new();
    harness.write_document(
        AUDIO_ENCODERS_STORE,
        json!({ "encoder_1": { "type": "mf_aac", "settings": {} } }),
    );
    harness.write_document(
        PROVIDERS_STORE,
        json!({ "provider_1": { "type": "rtmp_common", "settings": {} } }),
    );
    harness.write_document(
        OUTPUTS_STORE,
        json!({
            "output_1": {
                "type": "rtmp_output",
                "settings": {},
                "audioEncoder": "encoder_1",
                "videoEncoder": "encoder_9",
                "provider": "provider_1"
            }
        }),
    );

    let registries = registries(&harness);

    let output = registries.outputs.output("output_1").unwrap();
    assert_eq!(output.video_encoder_id, None);
    assert_eq!(output.audio_encoder_id, None);
    assert_eq!(output.provider_id.as_deref(), Some("provider_1"));

    let bindings = harness.engine.output_bindings("output_1").unwrap();
    assert_eq!(bindings.video_encoder, None);
    assert!(bindings.audio_tracks.is_empty());

    let stored = &harness.document(OUTPUTS_STORE)["output_1"];
    assert!(stored.get("videoEncoder").is_none());
    assert!(stored.get("audioEncoder").is_none());
    assert_eq!(stored["provider"], "provider_1");
}

#[test]
fn test_unknown_persisted_type_aborts_init() {
    let harness = Harness::new();
    harness.write_document(
        VIDEO_ENCODERS_STORE,
        json!({ "encoder_1": { "type": "no_such_codec", "settings": {} } }),
    );

    let mut registries = Registries::new(&harness.context()).unwrap();
    let err = registries.init().unwrap_err();
    assert!(matches!(err, PipelineError::Engine(EngineError::UnknownType { .. })));
}

#[test]
fn test_binding_an_unregistered_output_fails() {
    let harness = Harness::new();
    let mut registries = registries(&harness);

    harness
        .engine
        .create(HandleKind::Output, "rtmp_output", "output_1", None)
        .unwrap();

    let err = registries
        .outputs
        .set_output_service("output_1", "provider_1")
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnknownEntity { kind: "output", .. }));
}

#[test]
fn test_subscribers_see_changes_in_order() {
    let harness = Harness::new();
    let mut registries = registries(&harness);
    let encoder_events = registries.encoders.subscribe();
    let output_events = registries.outputs.subscribe();
    let engine = harness.engine.as_ref();

    let audio = construct_encoder(engine, EncoderKind::Audio, "mf_aac", "encoder_1", Settings::new()).unwrap();
    registries.encoders.add(audio).unwrap();
    registries.encoders.remove_audio_encoder("encoder_1").unwrap();

    let output = construct_output(engine, "rtmp_output", "output_1", Settings::new()).unwrap();
    registries.outputs.add(output).unwrap();
    registries.outputs.start("output_1").unwrap();
    registries.outputs.stop("output_1").unwrap();

    let encoder_events: Vec<EncoderEvent> = encoder_events.try_iter().collect();
    assert!(matches!(encoder_events[0], EncoderEvent::Added(ref e) if e.unique_id == "encoder_1"));
    assert!(matches!(
        encoder_events[1],
        EncoderEvent::Removed { kind: EncoderKind::Audio, ref unique_id } if unique_id == "encoder_1"
    ));
    assert_eq!(encoder_events.len(), 2);

    let output_events: Vec<OutputEvent> = output_events.try_iter().collect();
    assert!(matches!(output_events[0], OutputEvent::Added(_)));
    assert!(matches!(output_events[1], OutputEvent::Started { .. }));
    assert!(matches!(output_events[2], OutputEvent::Stopped { .. }));
    assert!(!registries.outputs.is_output_active("output_1"));
}

#[test]
fn test_outputs_keep_registration_order() {
    let harness = Harness::new();
    let mut registries = registries(&harness);

    for id in ["output_3", "output_1", "output_2"] {
        let output = construct_output(harness.engine.as_ref(), "ffmpeg_output", id, Settings::new()).unwrap();
        registries.outputs.add(output).unwrap();
    }
    registries.outputs.remove("output_1").unwrap();

    let ids: Vec<&str> = registries.outputs.outputs().keys().map(String::as_str).collect();
    assert_eq!(ids, ["output_3", "output_2"]);
}
