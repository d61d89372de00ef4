//! The same layout described in CSV, JSON and DBC must parse to one
//! canonical specification.

use canspec_core::{fingerprint, MessageId};
use canspec_parse::{parse, SpecFormat};

const CSV: &str = "\
MessageId,SignalName,StartBit,BitLength,IsSigned,IsBigEndian,Min,Max,Factor,Offset,Unit,MessageName,ByteLength,Transmitter,CycleTime
0x120,Mode,0,4,false,false,0,15,1,0,,VehicleStatus,4,ADAS_CTRL,100
0x1A0,WheelSpeed_FL,0,16,false,false,0,655.35,0.01,0,km/h,Wheels,8,ABS,20
0x120,Torque,8,12,true,true,-100,100,0.5,-100,Nm,,,,
0x1A0,WheelSpeed_FR,16,16,false,false,0,655.35,0.01,0,km/h,,,,
";

const JSON: &str = r#"{
  "messages": [
    { "messageId": "0x120", "name": "VehicleStatus", "byteLength": 4,
      "transmitter": "ADAS_CTRL", "cycleTime": 100,
      "signals": [
        { "name": "Mode", "startBit": 0, "bitLength": 4, "isSigned": false, "isBigEndian": false,
          "min": 0, "max": 15, "factor": 1, "offset": 0, "unit": "" },
        { "name": "Torque", "startBit": 8, "bitLength": 12, "isSigned": true, "isBigEndian": true,
          "min": -100, "max": 100, "factor": 0.5, "offset": -100, "unit": "Nm" }
      ] },
    { "messageId": 416, "name": "Wheels", "dlc": 8, "transmitter": "ABS", "cycleTime": 20,
      "signals": [
        { "name": "WheelSpeed_FL", "startBit": 0, "bitLength": 16, "isSigned": false, "isBigEndian": false,
          "min": 0, "max": 655.35, "factor": 0.01, "offset": 0, "unit": "km/h" },
        { "name": "WheelSpeed_FR", "startBit": 16, "bitLength": 16, "isSigned": false, "isBigEndian": false,
          "min": 0, "max": 655.35, "factor": 0.01, "offset": 0, "unit": "km/h" }
      ] }
  ]
}"#;

const DBC: &str = r#"VERSION ""

BU_: ADAS_CTRL ABS PCM

BO_ 288 VehicleStatus: 4 ADAS_CTRL
 SG_ Mode : 0|4@1+ (1,0) [0|15] "" PCM
 SG_ Torque : 8|12@0- (0.5,-100) [-100|100] "Nm" PCM

BO_ 416 Wheels: 8 ABS
 SG_ WheelSpeed_FL : 0|16@1+ (0.01,0) [0|655.35] "km/h" PCM
 SG_ WheelSpeed_FR : 16|16@1+ (0.01,0) [0|655.35] "km/h" PCM

BA_ "GenMsgCycleTime" BO_ 288 100;
BA_ "GenMsgCycleTime" BO_ 416 20;
"#;

#[test]
fn csv_json_and_dbc_agree() {
    let from_csv = parse(CSV.as_bytes(), SpecFormat::Csv).expect("parse csv");
    let from_json = parse(JSON.as_bytes(), SpecFormat::Json).expect("parse json");
    let from_dbc = parse(DBC.as_bytes(), SpecFormat::Dbc).expect("parse dbc");

    assert_eq!(from_csv, from_json);
    assert_eq!(from_csv, from_dbc);
    assert_eq!(fingerprint(&from_csv).unwrap(), fingerprint(&from_json).unwrap());
    assert_eq!(fingerprint(&from_csv).unwrap(), fingerprint(&from_dbc).unwrap());
}

#[test]
fn canonical_shape() {
    let spec = parse(CSV.as_bytes(), SpecFormat::Csv).expect("parse csv");
    let ids: Vec<_> = spec.messages().iter().map(|m| m.id).collect();
    assert_eq!(ids, [MessageId(0x120), MessageId(0x1A0)]);
    assert_eq!(spec.signal_count(), 4);

    let status = spec.message(MessageId(288)).expect("VehicleStatus");
    assert_eq!(status.signals[1].name, "Torque");
    assert_eq!(status.transmitter.as_deref(), Some("ADAS_CTRL"));
}

#[test]
fn canonical_json_round_trips() {
    let spec = parse(DBC.as_bytes(), SpecFormat::Dbc).expect("parse dbc");
    let json = serde_json::to_string(&spec).expect("serialize");
    let back: canspec_core::Specification = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(spec, back);
}
