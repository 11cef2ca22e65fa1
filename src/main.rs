// If using the `binstart` feature of `esp-idf-sys`, always keep this module
// imported
use anyhow::Context;
use envnode::{
    esp::{self, adc::QtPyAdc, i2c::I2c0Connector, mqtt::MqttPublisher, wifi, ws2812},
    Category, I2cCommand, LogPublisher, Node, Publisher, Shutdown,
};
use esp_idf_hal::{delay::FreeRtos, peripherals::Peripherals};
use esp_idf_svc::{eventloop::EspSystemEventLoop, log::EspLogger, nvs::EspDefaultNvsPartition};
use esp_idf_sys as _;

const SSID: &str = env!("WIFI_SSID");
const PASS: &str = env!("WIFI_PASS");
const MQTT_URL: Option<&str> = option_env!("MQTT_URL");
const SENSOR_NAME: &str = match option_env!("SENSOR_NAME") {
    Some(name) => name,
    None => "envnode",
};

/// SGP30 air quality sensor on the STEMMA QT port.
const SGP30_ADDR: u8 = 0x58;
const SGP30_INIT_AIR_QUALITY: [u8; 2] = [0x20, 0x03];
const SGP30_MEASURE_AIR_QUALITY: [u8; 2] = [0x20, 0x08];

fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise, some patches to the
    // runtime implemented by esp-idf-sys might not link properly. See
    // https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_sys::link_patches();
    EspLogger::initialize_default();

    let config = esp::config(SENSOR_NAME);
    log::info!("{SENSOR_NAME} is go! {config:?}");

    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let pins = peripherals.pins;

    // QT Py C3 neopixel is on GPIO 2
    let mut neopixel = ws2812::NeoPixel::new(pins.gpio2, peripherals.rmt.channel0)?;
    neopixel
        .set_color(ws2812::Rgb::RED)
        .context("set neopixel red")?;

    let sysloop = EspSystemEventLoop::take().context("failed to initialize system event loop")?;
    let nvs =
        EspDefaultNvsPartition::take().context("failed to initialize non-volatile storage")?;
    let _wifi = wifi::bringup(peripherals.modem, &sysloop, nvs, SSID, PASS)
        .context("failed to bring up WiFi")?;

    let publisher: Box<dyn Publisher> = match MQTT_URL {
        Some(url) => Box::new(MqttPublisher::connect(url, SENSOR_NAME)?),
        None => {
            log::warn!("MQTT_URL not set; readings will only be logged");
            Box::new(LogPublisher)
        }
    };

    let adc = QtPyAdc::new(peripherals.adc1, pins.gpio4, pins.gpio3, pins.gpio1, pins.gpio0)
        .context("failed to initialize ADC1")?;
    let connector = I2c0Connector::new(peripherals.i2c0, pins.gpio5, pins.gpio6);
    let mut node = Node::new(config, connector, adc, neopixel, FreeRtos)?;

    node.register_analog("soil_moisture", 4)
        .context("registering soil moisture probe")?;
    node.register_command(
        "air_quality_init",
        Category::Init,
        I2cCommand::new(SGP30_ADDR, SGP30_INIT_AIR_QUALITY),
    )
    .context("registering SGP30 init")?;
    // only the eCO2 word; stopping the read early skips its CRC and the
    // TVOC word.
    node.register_command(
        "air_quality",
        Category::Measure,
        I2cCommand::new(SGP30_ADDR, SGP30_MEASURE_AIR_QUALITY).with_response_len(2),
    )
    .context("registering SGP30 measurement")?;

    node.run(publisher, &Shutdown::new());
    Ok(())
}
