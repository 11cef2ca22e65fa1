use crate::adc::{Adc, Pin};
use esp_idf_hal::{
    adc::{config::Config, AdcChannelDriver, AdcDriver, Atten11dB, ADC1},
    gpio::{Gpio0, Gpio1, Gpio3, Gpio4},
};

type Channel<P> = AdcChannelDriver<'static, P, Atten11dB<ADC1>>;

/// The QT Py's A0-A3 inputs on ADC1, with 11 dB attenuation (full 0-3.3 V
/// range).
pub struct QtPyAdc {
    driver: AdcDriver<'static, ADC1>,
    a0: Channel<Gpio4>,
    a1: Channel<Gpio3>,
    a2: Channel<Gpio1>,
    a3: Channel<Gpio0>,
}

impl QtPyAdc {
    pub fn new(
        adc1: ADC1,
        a0: Gpio4,
        a1: Gpio3,
        a2: Gpio1,
        a3: Gpio0,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            driver: AdcDriver::new(adc1, &Config::new().calibration(true))?,
            a0: AdcChannelDriver::new(a0)?,
            a1: AdcChannelDriver::new(a1)?,
            a2: AdcChannelDriver::new(a2)?,
            a3: AdcChannelDriver::new(a3)?,
        })
    }
}

impl Adc for QtPyAdc {
    type Error = anyhow::Error;

    fn read_u16(&mut self, pin: Pin) -> anyhow::Result<u16> {
        let millivolts = match pin {
            4 => self.driver.read(&mut self.a0)?,
            3 => self.driver.read(&mut self.a1)?,
            1 => self.driver.read(&mut self.a2)?,
            0 => self.driver.read(&mut self.a3)?,
            _ => anyhow::bail!("GPIO{pin} is not an ADC1 input on this board"),
        };
        Ok(scale_to_u16(millivolts))
    }
}

/// The calibrated driver reports millivolts; scale to the full 16-bit range
/// so readings are comparable across boards.
fn scale_to_u16(millivolts: u16) -> u16 {
    const FULL_SCALE_MV: u32 = 3300;
    let millivolts = u32::from(millivolts).min(FULL_SCALE_MV);
    (millivolts * u32::from(u16::MAX) / FULL_SCALE_MV) as u16
}
