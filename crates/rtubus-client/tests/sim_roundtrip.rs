use rtubus_client::{ClientOptions, SyncRtuClient};
use rtubus_core::transform::{TextEncoding, WordCodec};
use rtubus_datalink::InMemorySlave;

fn sync_client(options: ClientOptions) -> SyncRtuClient<InMemorySlave> {
    let slave = InMemorySlave::new(1, 64, 64, 300, 64);
    SyncRtuClient::with_datalink(slave, options).expect("sync client should build")
}

#[test]
fn typed_register_roundtrip_through_simulated_slave() {
    let client = sync_client(ClientOptions::default());

    client
        .write_u16s("10", &[0x1234, 0xABCD])
        .expect("write should succeed");
    let values = client
        .read_u16_array("10", 2)
        .expect("read should succeed");
    assert_eq!(values, vec![0x1234, 0xABCD]);

    client
        .write_f32s("20", &[1.5, -2.25])
        .expect("float write should succeed");
    assert_eq!(client.read_f32("20").expect("float read"), 1.5);
    assert_eq!(client.read_f32("22").expect("float read"), -2.25);

    client
        .write_i64s("30", &[-1_234_567_890_123])
        .expect("i64 write should succeed");
    assert_eq!(
        client.read_i64("30").expect("i64 read"),
        -1_234_567_890_123
    );
}

#[test]
fn roundtrips_hold_under_every_swap_policy() {
    for word_swap in [false, true] {
        for multi_word_swap in [false, true] {
            let codec = WordCodec::new(word_swap, multi_word_swap, false);
            let client =
                sync_client(ClientOptions::default().with_codec(codec));

            client.write_u32s("0", &[0xDEAD_BEEF]).expect("write");
            assert_eq!(client.read_u32("0").expect("read"), 0xDEAD_BEEF);

            client.write_f64s("8", &[6.02214e23]).expect("write");
            assert_eq!(client.read_f64("8").expect("read"), 6.02214e23);
        }
    }
}

#[test]
fn coil_writes_read_back() {
    let client = sync_client(ClientOptions::default());

    client.write_bit("5", true).expect("single coil write");
    assert!(client.read_bit("5").expect("single coil read"));

    let pattern = [true, false, true, true, false, false, true, false, true];
    client.write_bits("10", &pattern).expect("bulk coil write");
    assert_eq!(
        client.read_bits("10", 9).expect("bulk coil read"),
        pattern
    );
}

#[test]
fn string_roundtrip_with_word_swap() {
    let codec = WordCodec::new(true, false, true);
    let client = sync_client(ClientOptions::default().with_codec(codec));

    client
        .write_string("40", "pump-7", TextEncoding::Ascii, None)
        .expect("string write");
    assert_eq!(
        client
            .read_string("40", 3, TextEncoding::Ascii)
            .expect("string read"),
        "pump-7"
    );
}

#[test]
fn chunked_read_crosses_simulated_bank() {
    let slave = InMemorySlave::new(1, 64, 64, 300, 64);
    for i in 0..250u16 {
        slave.set_holding_register(i, i).expect("seed");
    }
    let client = SyncRtuClient::with_datalink(slave, ClientOptions::default())
        .expect("sync client should build");

    let payload = client.read("0", 250).expect("chunked read");
    assert_eq!(payload.len(), 500);
    // Spot-check a register from each chunk (payload is raw big-endian).
    assert_eq!(&payload[0..2], &[0x00, 0x00]);
    assert_eq!(&payload[240..242], &120u16.to_be_bytes());
    assert_eq!(&payload[498..500], &249u16.to_be_bytes());
}

#[test]
fn out_of_range_read_surfaces_the_exception() {
    let client = sync_client(ClientOptions::default());

    let err = client.read_u16("2000").expect_err("read must fail");
    let rendered = err.to_string();
    assert!(
        rendered.contains("Illegal data address"),
        "unexpected error: {rendered}"
    );
}

#[test]
fn one_based_addressing_maps_to_wire_offset_zero() {
    let client = sync_client(
        ClientOptions::default().with_zero_based_addressing(false),
    );

    client.write_u16s("1", &[0x00FF]).expect("write");
    assert_eq!(client.read_u16("1").expect("read"), 0x00FF);
}

#[test]
fn input_registers_are_reachable_via_function_override() {
    let slave = InMemorySlave::new(1, 8, 8, 8, 8);
    slave.set_input_register(3, 0x0102).expect("seed input register");
    let client = SyncRtuClient::with_datalink(
        slave,
        ClientOptions::default().with_codec(WordCodec::new(false, false, false)),
    )
    .expect("sync client should build");

    assert_eq!(client.read_u16("x=4;3").expect("read"), 0x0102);
}
