#![cfg(feature = "std")]

use std::path::Path;

use csv::ReaderBuilder;
use regulator::{
    avec::{
        FromDive, FromSamples,
        field::{DateTime, FieldValue},
    },
    sans::{
        header::Model,
        sample::{Deco, Event},
    },
};

#[test]
fn decode_slice_iconhd_nitrox() {
    const PATH: &str = "fixtures/iconhd-nitrox.dive";
    let data = std::fs::read(PATH).unwrap();
    let mut validator = Validator::new(PATH);
    regulator::avec::decode_slice(&data, Model::IconHd, &mut validator).unwrap();
    validator.finish();
}

#[test]
fn decode_slice_genius_multigas() {
    const PATH: &str = "fixtures/genius-multigas.dive";
    let data = std::fs::read(PATH).unwrap();
    let mut validator = Validator::new(PATH);
    regulator::avec::decode_slice(&data, Model::Genius, &mut validator).unwrap();
    validator.finish();
}

#[test]
fn decode_reader_iconhd_nitrox() {
    const PATH: &str = "fixtures/iconhd-nitrox.dive";
    let mut file = std::fs::File::open(PATH).unwrap();
    let mut validator = Validator::new(PATH);
    regulator::avec::decode_reader(&mut file, Model::IconHd, &mut validator).unwrap();
    validator.finish();
}

#[test]
fn decode_reader_genius_multigas() {
    const PATH: &str = "fixtures/genius-multigas.dive";
    let mut file = std::fs::File::open(PATH).unwrap();
    let mut validator = Validator::new(PATH);
    regulator::avec::decode_reader(&mut file, Model::Genius, &mut validator).unwrap();
    validator.finish();
}

struct Validator(Vec<Vec<String>>);

impl Validator {
    fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().with_extension("csv");

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_path(path)
            .unwrap();

        let expected: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
            .collect();

        Self(expected)
    }

    fn validate(&mut self, name: &str, values: &[String]) {
        let expected = self.0.remove(0);
        assert_eq!(expected[0], name);
        assert_eq!(&expected[1..], values, "{name}");
    }

    fn finish(&self) {
        assert!(self.0.is_empty(), "{} rows not received", self.0.len());
    }
}

impl FromDive for Validator {
    fn add_datetime(&mut self, datetime: DateTime) {
        let DateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
        } = datetime;
        self.validate(
            "datetime",
            &[year, month, day, hour, minute, second].map(|v| v.to_string()),
        );
    }

    fn add_field(&mut self, field: FieldValue) {
        match field {
            FieldValue::DiveTime(time) => self.validate("divetime", &[time.to_string()]),
            FieldValue::MaxDepth(depth) => self.validate("maxdepth", &[depth.to_string()]),
            FieldValue::GasMixCount(count) => self.validate("gasmixes", &[count.to_string()]),
            FieldValue::GasMix(gas) => self.validate(
                "gasmix",
                &[gas.oxygen, gas.helium, gas.nitrogen].map(|v| v.to_string()),
            ),
            FieldValue::TankCount(count) => self.validate("tanks", &[count.to_string()]),
            FieldValue::Tank(tank) => self.validate(
                "tank",
                &[
                    format!("{:?}", tank.units),
                    tank.volume.to_string(),
                    tank.work_pressure.to_string(),
                    tank.begin_pressure.to_string(),
                    tank.end_pressure.to_string(),
                    tank.gas_mix.map_or("-".to_string(), |i| i.to_string()),
                ],
            ),
            FieldValue::Atmospheric(pressure) => {
                self.validate("atmospheric", &[pressure.to_string()])
            }
            FieldValue::Salinity(salinity) => self.validate(
                "salinity",
                &[format!("{:?}", salinity.water), salinity.density.to_string()],
            ),
            FieldValue::TemperatureMinimum(temperature) => {
                self.validate("temperature_minimum", &[temperature.to_string()])
            }
            FieldValue::TemperatureMaximum(temperature) => {
                self.validate("temperature_maximum", &[temperature.to_string()])
            }
            FieldValue::DiveMode(mode) => self.validate("divemode", &[format!("{mode:?}")]),
        }
    }

    fn samples(&mut self) -> Option<&mut dyn FromSamples> {
        Some(self)
    }
}

impl FromSamples for Validator {
    fn add_time(&mut self, time: u32) {
        self.validate("time", &[time.to_string()]);
    }
    fn add_depth(&mut self, depth: f64) {
        self.validate("depth", &[depth.to_string()]);
    }
    fn add_temperature(&mut self, temperature: f64) {
        self.validate("temperature", &[temperature.to_string()]);
    }
    fn add_gas_mix(&mut self, index: usize) {
        self.validate("gasmix_index", &[index.to_string()]);
    }
    fn add_deco(&mut self, deco: Deco) {
        self.validate(
            "deco",
            &[
                format!("{:?}", deco.kind),
                deco.time.to_string(),
                deco.depth.to_string(),
            ],
        );
    }
    fn add_pressure(&mut self, tank: usize, pressure: f64) {
        self.validate("pressure", &[tank.to_string(), pressure.to_string()]);
    }
    fn add_event(&mut self, event: Event) {
        self.validate(
            "event",
            &[format!("{:?}", event.kind), format!("{:?}", event.alarm)],
        );
    }
}
