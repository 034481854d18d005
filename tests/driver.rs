//! Driver tests against `embedded-hal-mock` transaction expectations.

use embedded_hal::i2c::ErrorKind;
use embedded_hal_mock::eh1::i2c::{Mock, Transaction};
use vcnl4010::{Error, ModulatorFrequency, SampleRate, Vcnl4010, DEFAULT_I2C_ADDRESS};

const ADDR: u8 = DEFAULT_I2C_ADDRESS;

/// The exact transaction sequence `Vcnl4010::new` performs: identity read,
/// then the factory power-on defaults.
fn power_on_defaults(product_id: u8) -> Vec<Transaction> {
    vec![
        Transaction::write_read(ADDR, vec![0x81], vec![product_id]),
        // LED current 200 mA
        Transaction::write(ADDR, vec![0x83, 20]),
        // slowest sample rate
        Transaction::write(ADDR, vec![0x82, 0]),
        // lowest modulator frequency, read-modify-write
        Transaction::write_read(ADDR, vec![0x8F], vec![0x00]),
        Transaction::write(ADDR, vec![0x8F, 0x00]),
        // self-timed interrupt mode
        Transaction::write(ADDR, vec![0x89, 0x08]),
    ]
}

/// Builds a driver whose mock expects the init sequence plus `extra`.
fn new_sensor(extra: &[Transaction]) -> (Vcnl4010<Mock>, Mock) {
    let mut transactions = power_on_defaults(0x21);
    transactions.extend_from_slice(extra);
    let mock = Mock::new(&transactions);
    let sensor = Vcnl4010::new(mock.clone()).unwrap();
    (sensor, mock)
}

#[test]
fn init_writes_power_on_defaults() {
    let (sensor, mut mock) = new_sensor(&[]);
    // the bus comes back out of the driver
    let _i2c = sensor.release();
    mock.done();
}

#[test]
fn init_rejects_wrong_product_id() {
    for product_id in [0x31u8, 0x1F] {
        let mut mock = Mock::new(&[Transaction::write_read(
            ADDR,
            vec![0x81],
            vec![product_id],
        )]);
        let result = Vcnl4010::new(mock.clone());
        assert!(matches!(result, Err(Error::UnknownDevice(found)) if found == product_id));
        mock.done();
    }
}

#[test]
fn init_accepts_any_revision_nibble() {
    // 0x26 = VCNL4010 family, revision 6
    let mut mock = Mock::new(&power_on_defaults(0x26));
    assert!(Vcnl4010::new(mock.clone()).is_ok());
    mock.done();
}

#[test]
fn led_current_round_trips() {
    let mut extra = Vec::new();
    for value in 0..=20u8 {
        extra.push(Transaction::write(ADDR, vec![0x83, value]));
        extra.push(Transaction::write_read(ADDR, vec![0x83], vec![value]));
    }
    let (mut sensor, mut mock) = new_sensor(&extra);
    for value in 0..=20u8 {
        sensor.set_led_current(value).unwrap();
        assert_eq!(sensor.get_led_current().unwrap(), value);
    }
    mock.done();
}

#[test]
fn led_current_get_masks_reserved_bits() {
    // fuse bits above the current field must not leak into the value
    let extra = [Transaction::write_read(ADDR, vec![0x83], vec![0xD4])];
    let (mut sensor, mut mock) = new_sensor(&extra);
    assert_eq!(sensor.get_led_current().unwrap(), 0x14);
    mock.done();
}

#[test]
fn led_current_rejects_out_of_range() {
    let (mut sensor, mut mock) = new_sensor(&[]);
    assert!(matches!(
        sensor.set_led_current(21),
        Err(Error::InvalidArgument)
    ));
    assert!(matches!(
        sensor.set_led_current_ma(210),
        Err(Error::InvalidArgument)
    ));
    // nothing was written to the device
    mock.done();
}

#[test]
fn led_current_ma_quantizes_down() {
    let extra = [
        Transaction::write(ADDR, vec![0x83, 12]),
        Transaction::write_read(ADDR, vec![0x83], vec![12]),
        Transaction::write_read(ADDR, vec![0x83], vec![12]),
    ];
    let (mut sensor, mut mock) = new_sensor(&extra);
    // 123 mA quantizes to the 120 mA register step
    sensor.set_led_current_ma(123).unwrap();
    assert_eq!(sensor.get_led_current().unwrap(), 12);
    assert_eq!(sensor.get_led_current_ma().unwrap(), 120);
    mock.done();
}

#[test]
fn samplerate_round_trips() {
    let extra = [
        Transaction::write(ADDR, vec![0x82, 7]),
        Transaction::write_read(ADDR, vec![0x82], vec![7]),
    ];
    let (mut sensor, mut mock) = new_sensor(&extra);
    sensor.set_samplerate(SampleRate::Rate250).unwrap();
    assert_eq!(sensor.get_samplerate().unwrap(), SampleRate::Rate250);
    mock.done();
}

#[test]
fn samplerate_surfaces_unknown_register_contents() {
    let extra = [Transaction::write_read(ADDR, vec![0x82], vec![9])];
    let (mut sensor, mut mock) = new_sensor(&extra);
    assert_eq!(sensor.get_samplerate().unwrap(), SampleRate::Unknown(9));
    // and an unknown index is never written back
    assert!(matches!(
        sensor.set_samplerate(SampleRate::Unknown(9)),
        Err(Error::InvalidArgument)
    ));
    mock.done();
}

#[test]
fn frequency_preserves_unrelated_timing_bits() {
    let extra = [
        Transaction::write_read(ADDR, vec![0x8F], vec![0b1110_0111]),
        Transaction::write(ADDR, vec![0x8F, 0b1111_0111]),
        Transaction::write_read(ADDR, vec![0x8F], vec![0b1111_0111]),
    ];
    let (mut sensor, mut mock) = new_sensor(&extra);
    sensor
        .set_frequency(ModulatorFrequency::Freq1M5625)
        .unwrap();
    assert_eq!(
        sensor.get_frequency().unwrap(),
        ModulatorFrequency::Freq1M5625
    );
    mock.done();
}

#[test]
fn proximity_polls_until_ready() {
    let extra = [
        // interrupt status: top bit cleared, the rest written back intact
        Transaction::write_read(ADDR, vec![0x8E], vec![0x85]),
        Transaction::write(ADDR, vec![0x8E, 0x05]),
        // trigger
        Transaction::write(ADDR, vec![0x80, 0x08]),
        // not ready for three polls
        Transaction::write_read(ADDR, vec![0x80], vec![0x00]),
        Transaction::write_read(ADDR, vec![0x80], vec![0x00]),
        Transaction::write_read(ADDR, vec![0x80], vec![0x00]),
        Transaction::write_read(ADDR, vec![0x80], vec![0x20]),
        // big-endian result
        Transaction::write_read(ADDR, vec![0x87], vec![0x01, 0x02]),
    ];
    let (mut sensor, mut mock) = new_sensor(&extra);
    assert_eq!(sensor.get_proximity().unwrap(), 0x0102);
    mock.done();
}

#[test]
fn ambient_reads_big_endian_result() {
    let extra = [
        Transaction::write_read(ADDR, vec![0x8E], vec![0xFF]),
        Transaction::write(ADDR, vec![0x8E, 0x7F]),
        Transaction::write(ADDR, vec![0x80, 0x10]),
        Transaction::write_read(ADDR, vec![0x80], vec![0x40]),
        Transaction::write_read(ADDR, vec![0x85], vec![0x12, 0x34]),
    ];
    let (mut sensor, mut mock) = new_sensor(&extra);
    assert_eq!(sensor.get_ambient().unwrap(), 0x1234);
    mock.done();
}

#[test]
fn ambient_lux_scales_raw_count() {
    fn ambient_measurement(data: [u8; 2]) -> [Transaction; 5] {
        [
            Transaction::write_read(ADDR, vec![0x8E], vec![0x00]),
            Transaction::write(ADDR, vec![0x8E, 0x00]),
            Transaction::write(ADDR, vec![0x80, 0x10]),
            Transaction::write_read(ADDR, vec![0x80], vec![0x40]),
            Transaction::write_read(ADDR, vec![0x85], data.to_vec()),
        ]
    }
    let mut extra = ambient_measurement([0x00, 0x00]).to_vec();
    extra.extend(ambient_measurement([0xFF, 0xFF]));
    let (mut sensor, mut mock) = new_sensor(&extra);
    assert_eq!(sensor.get_ambient_lux().unwrap(), 0.0);
    assert_eq!(sensor.get_ambient_lux().unwrap(), 16383.75);
    mock.done();
}

#[test]
fn poll_limit_times_out() {
    let extra = [
        Transaction::write_read(ADDR, vec![0x8E], vec![0x00]),
        Transaction::write(ADDR, vec![0x8E, 0x00]),
        Transaction::write(ADDR, vec![0x80, 0x08]),
        Transaction::write_read(ADDR, vec![0x80], vec![0x00]),
        Transaction::write_read(ADDR, vec![0x80], vec![0x00]),
        Transaction::write_read(ADDR, vec![0x80], vec![0x00]),
    ];
    let (mut sensor, mut mock) = new_sensor(&extra);
    sensor.set_poll_limit(Some(3));
    assert!(matches!(sensor.get_proximity(), Err(Error::Timeout)));
    mock.done();
}

#[test]
fn bus_error_propagates() {
    let extra =
        [Transaction::write_read(ADDR, vec![0x83], vec![0]).with_error(ErrorKind::Other)];
    let (mut sensor, mut mock) = new_sensor(&extra);
    assert!(matches!(
        sensor.get_led_current(),
        Err(Error::I2cError(ErrorKind::Other))
    ));
    mock.done();
}
