// ==========================================
// Repository 集成测试
// ==========================================
// 测试目标: 参考数据仓储在共享连接上的读写
// ==========================================

mod helpers;

use std::sync::{Arc, Mutex};

use facility_airflow::domain::facility::{Building, Floor};
use facility_airflow::repository::{
    BuildingRepository, EventRepository, OccupancyCategoryRepository, RepositoryError,
    RoomRepository,
};
use helpers::test_data_builder::{EventBuilder, RoomBuilder};
use test_helpers::{
    create_test_db, insert_reference_data, open_test_connection, BUILDING_ID, ROOM_CLASSROOM,
    ROOM_OFFICE, ROOM_STORAGE,
};

fn shared_conn(db_path: &str) -> Arc<Mutex<rusqlite::Connection>> {
    let conn = open_test_connection(db_path).expect("Failed to open db");
    insert_reference_data(&conn).expect("Failed to insert reference data");
    Arc::new(Mutex::new(conn))
}

#[test]
fn test_event_repository_批量写入与前缀查询() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = EventRepository::new(shared_conn(&db_path));

    let events = vec![
        EventBuilder::new(1, "ENG-101").enrollment(30).build(),
        EventBuilder::new(2, "ENG-102").days("-T-R---").time((13, 0), (14, 15)).build(),
        EventBuilder::new(3, "SCI-201").enrollment(80).build(),
    ];
    assert_eq!(repo.batch_upsert(&events).unwrap(), 3);

    let eng = repo.find_by_facility_prefix("ENG-").unwrap();
    assert_eq!(eng.len(), 2);
    assert_eq!(eng[0], events[0]);
    // 缺失的人数保持为空
    assert_eq!(eng[1].enrollment_total, None);
    assert_eq!(eng[1].days_pattern(), "-T-R---");

    let mut updated = events[2].clone();
    updated.enrollment_total = Some(90);
    repo.upsert(&updated).unwrap();
    assert_eq!(repo.find_by_id(3).unwrap(), Some(updated));
    assert_eq!(repo.find_by_id(99).unwrap(), None);
}

#[test]
fn test_room_repository_按建筑查询与约束() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = RoomRepository::new(shared_conn(&db_path));

    let rooms = repo.find_by_building(BUILDING_ID).unwrap();
    let ids: Vec<i64> = rooms.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![ROOM_CLASSROOM, ROOM_OFFICE, ROOM_STORAGE]);

    let by_code = repo.find_by_facility_id("ENG-102").unwrap().unwrap();
    assert_eq!(by_code.design_population(), 12.0);

    // 编码唯一
    let duplicate = RoomBuilder::new(200, "ENG-101").area(10.0).build();
    assert!(matches!(
        repo.upsert(&duplicate),
        Err(RepositoryError::UniqueConstraintViolation(_))
    ));

    assert!(matches!(repo.get(999), Err(RepositoryError::NotFound { .. })));
}

#[test]
fn test_occupancy_repository_按建筑房间映射类别() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let conn = shared_conn(&db_path);
    let rooms = RoomRepository::new(conn.clone());
    let repo = OccupancyCategoryRepository::new(conn);

    // 无类别的房间不出现在映射中
    rooms
        .upsert(&RoomBuilder::new(104, "ENG-104").area(80.0).build())
        .unwrap();

    let map = repo.find_by_building_rooms(BUILDING_ID).unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map[&ROOM_CLASSROOM].category, "Classroom");
    assert_eq!(map[&ROOM_OFFICE].people_outdoor_air_rate, 5.0);
    assert!(!map.contains_key(&104));
}

#[test]
fn test_building_repository_楼层() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = BuildingRepository::new(shared_conn(&db_path));

    repo.upsert(&Building {
        id: 2,
        code: "SCI".to_string(),
        name: "Science Center".to_string(),
        campus: None,
        active: false,
    })
    .unwrap();
    repo.upsert_floor(&Floor {
        id: 2,
        building_id: 2,
        name: "B1".to_string(),
    })
    .unwrap();

    let active = repo.list_active().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].code, "ENG");
    assert_eq!(repo.find_floors(2).unwrap().len(), 1);
    assert_eq!(repo.find_by_id(2).unwrap().unwrap().name, "Science Center");
}
