mod ready_info;
